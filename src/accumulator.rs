//! Stream accumulation
//!
//! Consumes text deltas in arrival order and republishes the cumulative
//! response after every one of them. No buffering beyond concatenation.

use crate::llm::LlmError;
use futures::{Stream, StreamExt};

/// Receives the cumulative text after each delta
pub trait ContentSink {
    fn publish(&mut self, content: &str);
}

impl<F: FnMut(&str)> ContentSink for F {
    fn publish(&mut self, content: &str) {
        self(content);
    }
}

/// Growing response text
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    deltas: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta and return the text so far
    pub fn push(&mut self, delta: &str) -> &str {
        self.text.push_str(delta);
        self.deltas += 1;
        &self.text
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn deltas(&self) -> usize {
        self.deltas
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// The stream raised an error; whatever was published before stays put
#[derive(Debug)]
pub struct StreamFailure {
    pub partial: String,
    pub error: LlmError,
}

/// Drive `stream` to completion, publishing after every delta.
///
/// Stops at the first error.
pub async fn accumulate<S, K>(stream: S, sink: &mut K) -> Result<String, StreamFailure>
where
    S: Stream<Item = Result<String, LlmError>>,
    K: ContentSink + ?Sized,
{
    let mut stream = std::pin::pin!(stream);
    let mut accumulator = StreamAccumulator::new();

    while let Some(item) = stream.next().await {
        match item {
            Ok(delta) => sink.publish(accumulator.push(&delta)),
            Err(error) => {
                tracing::warn!(
                    deltas = accumulator.deltas(),
                    chars = accumulator.text().len(),
                    error = %error,
                    "Stream failed mid-response"
                );
                return Err(StreamFailure {
                    partial: accumulator.into_text(),
                    error,
                });
            }
        }
    }

    tracing::debug!(deltas = accumulator.deltas(), "Stream complete");
    Ok(accumulator.into_text())
}
