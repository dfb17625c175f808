//! Completion provider abstraction
//!
//! The conversation core talks to the model through a single seam: give it
//! a request, get back an ordered stream of text fragments.

mod error;
mod replay;
mod types;

pub use error::LlmError;
pub use replay::{ReplayProvider, DEMO_TRANSCRIPT};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for completion stream providers
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Open a response stream for the request
    async fn stream(&self, request: &CompletionRequest) -> Result<TextStream, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: CompletionProvider + ?Sized> CompletionProvider for Arc<T> {
    async fn stream(&self, request: &CompletionRequest) -> Result<TextStream, LlmError> {
        (**self).stream(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Logging wrapper for completion providers
pub struct LoggingProvider {
    inner: Arc<dyn CompletionProvider>,
    model_id: String,
}

impl LoggingProvider {
    pub fn new(inner: Arc<dyn CompletionProvider>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl CompletionProvider for LoggingProvider {
    async fn stream(&self, request: &CompletionRequest) -> Result<TextStream, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.stream(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    prompt_chars = request.prompt.len(),
                    attachments = request.attachments.len(),
                    attachment_bytes = request.attachment_bytes(),
                    "Completion stream opened"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    transient = e.kind.is_transient(),
                    "Completion stream failed to open"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
