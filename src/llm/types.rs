//! Common types for completion requests

use super::LlmError;
use crate::attachment::Attachment;
use futures::Stream;
use std::pin::Pin;

/// Ordered text fragments; concatenation reconstructs the full response
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// A single completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub attachments: Vec<Attachment>,
    pub temperature: f32,
}

impl CompletionRequest {
    /// Total bytes of base64 payload carried by the request
    pub fn attachment_bytes(&self) -> usize {
        self.attachments.iter().map(|a| a.data.len()).sum()
    }
}
