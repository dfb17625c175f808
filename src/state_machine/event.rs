//! Events that can occur in a conversation
//!
//! Identifiers and timestamps are minted by the runtime before an event
//! reaches the transition function, which keeps transitions pure.

use crate::attachment::Attachment;
use chrono::{DateTime, Utc};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserSubmit {
        text: String,
        attachments: Vec<Attachment>,
        request_id: String,
        user_message_id: String,
        assistant_message_id: String,
        timestamp: DateTime<Utc>,
    },
    AttachmentImported {
        attachment: Attachment,
        purpose: ImportPurpose,
    },
    StudyRequested {
        attachment: Attachment,
        request_id: String,
    },
    CloseArtifact,
    Reset,

    // Stream events
    ContentPublished {
        request_id: String,
        content: String,
    },
    StreamComplete {
        request_id: String,
        text: String,
        artifact_id: String,
    },
    StreamFailed {
        request_id: String,
        message: String,
    },
}

/// Where an imported file is headed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPurpose {
    /// Joins the pending list for the next chat message
    Chat,
    /// Held by the caller for a deep study
    Study,
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::UserSubmit { .. } => "user_submit",
            Event::AttachmentImported { .. } => "attachment_imported",
            Event::StudyRequested { .. } => "study_requested",
            Event::CloseArtifact => "close_artifact",
            Event::Reset => "reset",
            Event::ContentPublished { .. } => "content_published",
            Event::StreamComplete { .. } => "stream_complete",
            Event::StreamFailed { .. } => "stream_failed",
        }
    }
}
