//! Conversation state types

use serde::{Deserialize, Serialize};

/// Conversation state. Anything but `Idle` means one request is in flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// Ready for user input, no pending operations
    #[default]
    Idle,

    /// Chat response streaming into the assistant placeholder
    AwaitingResponse {
        request_id: String,
        assistant_message_id: String,
    },

    /// Deep study of one attachment streaming (not shown in chat)
    Studying {
        request_id: String,
        attachment_name: String,
    },
}

impl ConvState {
    /// The busy flag
    pub fn is_busy(&self) -> bool {
        !matches!(self, ConvState::Idle)
    }

    /// Id of the in-flight request, if any
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ConvState::Idle => None,
            ConvState::AwaitingResponse { request_id, .. }
            | ConvState::Studying { request_id, .. } => Some(request_id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConvState::Idle => "idle",
            ConvState::AwaitingResponse { .. } => "awaiting_response",
            ConvState::Studying { .. } => "studying",
        }
    }
}

/// Context for a conversation (immutable configuration)
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub conversation_id: String,
    pub model_id: String,
}

impl ConvContext {
    pub fn new(conversation_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            model_id: model_id.into(),
        }
    }
}
