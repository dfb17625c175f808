//! Effects produced by state transitions

use crate::artifact::Artifact;
use crate::attachment::Attachment;
use crate::llm::CompletionRequest;
use crate::session::Message;

/// Effects to be executed after state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Append a message to the history
    AppendMessage { message: Message },

    /// Replace a message's content
    UpdateMessage { message_id: String, content: String },

    /// Point a message at the artifact extracted from it
    LinkArtifact {
        message_id: String,
        artifact_id: String,
    },

    /// Add to the pending-attachment list
    AddPendingAttachment { attachment: Attachment },

    /// Empty the pending-attachment list
    ClearPendingAttachments,

    /// Open a completion stream (spawns as background task)
    RequestCompletion {
        request_id: String,
        request: CompletionRequest,
    },

    /// Deep study text has grown
    NotifyStudyProgress { chars: usize },

    /// Hand an artifact to the display surface, replacing any current one
    ShowArtifact { artifact: Artifact },

    /// Close the artifact display
    CloseArtifact,

    /// Append to the action log
    Log {
        action: &'static str,
        details: String,
    },

    /// Clear the conversation
    ResetSession,

    /// The in-flight request has finished, one way or the other
    NotifyDone,
}

impl Effect {
    pub fn append_message(message: Message) -> Self {
        Effect::AppendMessage { message }
    }

    pub fn log(action: &'static str, details: impl Into<String>) -> Self {
        Effect::Log {
            action,
            details: details.into(),
        }
    }
}
