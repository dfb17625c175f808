//! Offline provider that replays canned responses
//!
//! Stands in for a hosted model: each request takes the next response from
//! a transcript (cycling) and streams it back a word at a time.

use super::{CompletionProvider, CompletionRequest, LlmError, TextStream};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Line that separates responses in a transcript file
const SEPARATOR: &str = "---";

/// Built-in transcript used when no replay file is configured
pub const DEMO_TRANSCRIPT: &str = r#"Hello, I'm Lisa. I'm running from a local transcript right now, so my answers are canned, but everything you see streams through the real pipeline.
---
Here is your plan.
<artifact type="guide" title="Study Plan">
| Day | Focus |
|-----|-------|
| 1 | Review the core concepts |
| 2 | Practice with past questions |
| 3 | [PLAN: Mock exam] |
</artifact>
Would you like me to refine this study plan for a tighter schedule?
---
<artifact type="guide" title="Deep Study: Research Pack">
1. Core concepts summarised.
2. Key takeaways in a table.
3. A 7-day schedule.
4. Three deep-thinking questions.
</artifact>"#;

pub struct ReplayProvider {
    responses: Vec<String>,
    next: AtomicUsize,
    chunk_delay: Duration,
    model_id: String,
}

impl ReplayProvider {
    pub fn new(responses: Vec<String>, chunk_delay: Duration) -> Self {
        Self {
            responses,
            next: AtomicUsize::new(0),
            chunk_delay,
            model_id: "replay".to_string(),
        }
    }

    /// Build from transcript text (responses separated by `---` lines)
    pub fn from_transcript(transcript: &str, chunk_delay: Duration) -> Self {
        Self::new(parse_transcript(transcript), chunk_delay)
    }

    pub async fn from_file(path: &Path, chunk_delay: Duration) -> std::io::Result<Self> {
        let transcript = tokio::fs::read_to_string(path).await?;
        let provider = Self::from_transcript(&transcript, chunk_delay);
        tracing::info!(
            path = %path.display(),
            responses = provider.responses.len(),
            "Loaded replay transcript"
        );
        Ok(provider)
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }
}

#[async_trait]
impl CompletionProvider for ReplayProvider {
    async fn stream(&self, _request: &CompletionRequest) -> Result<TextStream, LlmError> {
        if self.responses.is_empty() {
            return Err(LlmError::invalid_request("Replay transcript has no responses"));
        }

        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.responses.len();
        let deltas = split_into_deltas(&self.responses[index]);
        let delay = self.chunk_delay;

        let stream = futures::stream::iter(deltas).then(move |delta| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(delta)
        });

        Ok(Box::pin(stream))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn parse_transcript(transcript: &str) -> Vec<String> {
    let mut responses = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in transcript.lines() {
        if line.trim_end() == SEPARATOR {
            push_response(&mut responses, &current);
            current.clear();
        } else {
            current.push(line);
        }
    }
    push_response(&mut responses, &current);

    responses
}

fn push_response(responses: &mut Vec<String>, lines: &[&str]) {
    let text = lines.join("\n");
    let text = text.trim_matches('\n');
    if !text.trim().is_empty() {
        responses.push(text.to_string());
    }
}

/// Split into word-sized deltas, each keeping its trailing whitespace
fn split_into_deltas(text: &str) -> Vec<String> {
    text.split_inclusive(char::is_whitespace)
        .map(str::to_string)
        .collect()
}
