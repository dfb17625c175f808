//! Conversation data: history, pending attachments, action log and the
//! currently displayed artifact.

use crate::artifact::Artifact;
use crate::attachment::Attachment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Greeting seeded into a fresh history
pub const DEFAULT_GREETING: &str = "Hello, I'm Lisa. How can I help you today? I'm here to support your growth, your family, and your big ideas. Let's make life better together.";

/// Action kinds written to the action log
pub mod action {
    pub const SESSION_START: &str = "SESSION_START";
    pub const SESSION_RESET: &str = "SESSION_RESET";
    pub const RESOURCE: &str = "RESOURCE";
    pub const STUDY_LOAD: &str = "STUDY_LOAD";
    pub const STUDY_START: &str = "STUDY_START";
    pub const STUDY_COMPLETE: &str = "STUDY_COMPLETE";
    pub const ERROR: &str = "ERROR";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    #[allow(dead_code)] // Part of the message model; nothing emits it yet
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
}

impl Message {
    pub fn user(
        id: impl Into<String>,
        content: impl Into<String>,
        attachments: Vec<Attachment>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::User,
            content: content.into(),
            timestamp,
            attachments,
            artifact_id: None,
        }
    }

    pub fn assistant(
        id: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp,
            attachments: Vec::new(),
            artifact_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub id: String,
    pub action: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything a conversation shows, owned by one runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    greeting: Option<String>,
    pub history: Vec<Message>,
    pub pending_attachments: Vec<Attachment>,
    pub action_log: Vec<ActionLogEntry>,
    pub displayed_artifact: Option<Artifact>,
}

impl Session {
    pub fn new(greeting: Option<String>) -> Self {
        let mut session = Self {
            greeting,
            history: Vec::new(),
            pending_attachments: Vec::new(),
            action_log: Vec::new(),
            displayed_artifact: None,
        };
        session.seed_greeting();
        session.log(action::SESSION_START, "Lisa session initialized.");
        session
    }

    fn seed_greeting(&mut self) {
        if let Some(greeting) = &self.greeting {
            self.history.push(Message::assistant(
                uuid::Uuid::new_v4().to_string(),
                greeting.clone(),
                Utc::now(),
            ));
        }
    }

    /// Append to the action log
    pub fn log(&mut self, action: &str, details: impl Into<String>) -> &ActionLogEntry {
        let details = details.into();
        tracing::info!(action = %action, details = %details, "Action");
        self.action_log.push(ActionLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            action: action.to_string(),
            details,
            timestamp: Utc::now(),
        });
        &self.action_log[self.action_log.len() - 1]
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.history.iter().find(|m| m.id == id)
    }

    pub fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.history.iter_mut().find(|m| m.id == id)
    }

    /// Append a message; ids must stay unique
    pub fn append(&mut self, message: Message) -> bool {
        if self.message(&message.id).is_some() {
            tracing::warn!(id = %message.id, "Duplicate message id, not appended");
            return false;
        }
        self.history.push(message);
        true
    }

    /// Clear history (re-seeding the greeting), pending attachments and the
    /// displayed artifact. The action log survives.
    pub fn reset(&mut self) {
        self.history.clear();
        self.pending_attachments.clear();
        self.displayed_artifact = None;
        self.seed_greeting();
        self.log(action::SESSION_RESET, "Conversation cleared.");
    }
}
