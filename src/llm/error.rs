//! LLM error types

use thiserror::Error;

/// LLM error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[cfg(test)]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::InvalidRequest, message)
    }

    /// The stream broke after it was opened
    #[cfg(test)]
    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Stream, message)
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Network issues, timeouts
    #[cfg_attr(not(test), allow(dead_code))] // Raised by the mock provider
    Network,
    /// Bad request, such as an empty replay transcript
    InvalidRequest,
    /// Failure raised while iterating an open stream
    #[cfg_attr(not(test), allow(dead_code))] // Raised by the mock provider
    Stream,
}

impl LlmErrorKind {
    /// Whether a later identical request could succeed.
    ///
    /// Nothing retries automatically; this only feeds log fields.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::Stream)
    }
}
