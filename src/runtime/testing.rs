//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use crate::llm::{CompletionProvider, CompletionRequest, LlmError, TextStream};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Mock Completion Provider
// ============================================================================

enum MockResponse {
    Stream {
        items: Vec<Result<String, LlmError>>,
        /// Stream yields nothing until notified
        gate: Option<Arc<Notify>>,
    },
    OpenError(LlmError),
}

/// Mock provider that returns queued responses
#[allow(dead_code)]
pub struct MockProvider {
    responses: Mutex<VecDeque<MockResponse>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<CompletionRequest>>,
}

#[allow(dead_code)]
impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: "mock-model".to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response streamed as the given deltas
    pub fn queue_deltas(&self, deltas: &[&str]) {
        let items = deltas.iter().map(|d| Ok((*d).to_string())).collect();
        self.push(MockResponse::Stream { items, gate: None });
    }

    /// Queue a response that yields `deltas` and then fails
    pub fn queue_failure(&self, deltas: &[&str], error: LlmError) {
        let mut items: Vec<_> = deltas.iter().map(|d| Ok((*d).to_string())).collect();
        items.push(Err(error));
        self.push(MockResponse::Stream { items, gate: None });
    }

    /// Queue a response held back until the returned gate is notified
    pub fn queue_gated(&self, deltas: &[&str]) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        let items = deltas.iter().map(|d| Ok((*d).to_string())).collect();
        self.push(MockResponse::Stream {
            items,
            gate: Some(Arc::clone(&gate)),
        });
        gate
    }

    /// Queue a failure to open the stream at all
    pub fn queue_open_error(&self, error: LlmError) {
        self.push(MockResponse::OpenError(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn push(&self, response: MockResponse) {
        self.responses.lock().unwrap().push_back(response);
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn stream(&self, request: &CompletionRequest) -> Result<TextStream, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let response = self.responses.lock().unwrap().pop_front();

        match response {
            Some(MockResponse::Stream { items, gate }) => {
                let stream = futures::stream::once(async move {
                    if let Some(gate) = gate {
                        gate.notified().await;
                    }
                })
                .flat_map(move |()| futures::stream::iter(items.clone()));
                Ok(Box::pin(stream))
            }
            Some(MockResponse::OpenError(e)) => Err(e),
            None => Err(LlmError::network("No mock response queued")),
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactKind, PLACEHOLDER};
    use crate::attachment::{self, FileUpload};
    use crate::runtime::{spawn_conversation, ConversationHandle, UiEvent};
    use crate::session::{action, MessageRole, Session, DEFAULT_GREETING};
    use crate::state_machine::{ConvContext, ConvState};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct TestHarness {
        handle: ConversationHandle,
        provider: Arc<MockProvider>,
        events: mpsc::UnboundedReceiver<UiEvent>,
    }

    impl TestHarness {
        fn new() -> Self {
            let provider = Arc::new(MockProvider::new());
            let handle = spawn_conversation(
                ConvContext::new("test-conv", "mock-model"),
                Arc::clone(&provider),
                Session::new(Some(DEFAULT_GREETING.to_string())),
            );
            let events = handle.subscribe();
            Self {
                handle,
                provider,
                events,
            }
        }

        /// Collect UI events up to and including the next `Done`
        async fn wait_for_done(&mut self) -> Vec<UiEvent> {
            self.wait_for(|e| matches!(e, UiEvent::Done)).await
        }

        async fn wait_for(&mut self, stop: impl Fn(&UiEvent) -> bool) -> Vec<UiEvent> {
            let mut seen = Vec::new();
            tokio::time::timeout(Duration::from_secs(5), async {
                loop {
                    let event = self.events.recv().await.expect("runtime stopped");
                    let done = stop(&event);
                    seen.push(event);
                    if done {
                        break;
                    }
                }
            })
            .await
            .expect("timed out waiting for UI event");
            seen
        }
    }

    fn upload(name: &str, bytes: &[u8]) -> Option<FileUpload> {
        Some(FileUpload {
            name: name.to_string(),
            mime_type: "text/plain".to_string(),
            bytes: bytes.to_vec(),
        })
    }

    fn updates(events: &[UiEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                UiEvent::MessageUpdated { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_mock_provider() {
        let mock = MockProvider::new();
        mock.queue_deltas(&["Hel", "lo"]);

        let request = crate::system_prompt::chat_request("hi", vec![]);
        let stream = mock.stream(&request).await.unwrap();
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 2);

        // Second call should fail (no more responses)
        assert!(mock.stream(&request).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_plain_chat_streams_in_order() {
        let mut h = TestHarness::new();
        h.provider.queue_deltas(&["Hel", "lo, ", "world"]);

        h.handle.submit("Hi Lisa").unwrap();
        let events = h.wait_for_done().await;

        assert_eq!(updates(&events), vec!["Hel", "Hello, ", "Hello, world"]);

        let session = h.handle.snapshot().await;
        assert_eq!(session.history.len(), 3);
        assert_eq!(session.history[1].role, MessageRole::User);
        assert_eq!(session.history[1].content, "Hi Lisa");
        assert_eq!(session.history[2].role, MessageRole::Assistant);
        assert_eq!(session.history[2].content, "Hello, world");
        assert!(session.history[2].artifact_id.is_none());
        assert!(session.displayed_artifact.is_none());
    }

    #[tokio::test]
    async fn test_artifact_is_extracted_and_shown() {
        let mut h = TestHarness::new();
        h.provider.queue_deltas(&[
            "Here is your plan.\n",
            "<artifact type=\"guide\" title=\"Study Plan\">",
            "Day 1: Review",
            "</artifact>",
        ]);

        h.handle.submit("Make me a study plan").unwrap();
        let events = h.wait_for_done().await;

        // Raw tags were visible while streaming, then replaced
        let updates = updates(&events);
        assert!(updates.iter().any(|u| u.contains("<artifact")));
        assert_eq!(
            updates.last().unwrap(),
            &format!("Here is your plan.\n{PLACEHOLDER}")
        );
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::ArtifactShown { artifact } if artifact.title == "Study Plan")));

        let session = h.handle.snapshot().await;
        let reply = &session.history[2];
        assert_eq!(reply.content, format!("Here is your plan.\n{PLACEHOLDER}"));

        let artifact = session.displayed_artifact.expect("artifact displayed");
        assert_eq!(artifact.kind, ArtifactKind::Guide);
        assert_eq!(artifact.content, "Day 1: Review");
        assert_eq!(reply.artifact_id.as_deref(), Some(artifact.id.as_str()));
    }

    #[tokio::test]
    async fn test_submit_while_busy_is_ignored() {
        let mut h = TestHarness::new();
        let gate = h.provider.queue_gated(&["first answer"]);

        h.handle.submit("first").unwrap();
        h.wait_for(|e| matches!(e, UiEvent::StateChanged { state } if state.is_busy()))
            .await;
        h.handle.submit("second").unwrap();
        h.handle.reset().unwrap();

        gate.notify_one();
        h.wait_for_done().await;

        let session = h.handle.snapshot().await;
        let contents: Vec<&str> = session.history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec![DEFAULT_GREETING, "first", "first answer"]);
        assert_eq!(h.provider.recorded_requests().len(), 1);
        // Rejections are silent
        assert!(session
            .action_log
            .iter()
            .all(|e| e.action != action::ERROR && e.action != action::SESSION_RESET));
    }

    #[tokio::test]
    async fn test_stream_failure_keeps_partial_and_frees_flag() {
        let mut h = TestHarness::new();
        h.provider
            .queue_failure(&["Partial ", "answer"], LlmError::network("connection reset"));

        h.handle.submit("Tell me").unwrap();
        let events = h.wait_for_done().await;
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::StateChanged { state: ConvState::Idle })));

        let session = h.handle.snapshot().await;
        assert_eq!(session.history[2].content, "Partial answer");
        let last = session.action_log.last().unwrap();
        assert_eq!(last.action, action::ERROR);
        assert_eq!(last.details, "Processing failed: connection reset");

        // Not retried, and the next submit goes through
        h.provider.queue_deltas(&["Recovered"]);
        h.handle.submit("Again").unwrap();
        h.wait_for_done().await;

        let session = h.handle.snapshot().await;
        assert_eq!(session.history.len(), 5);
        assert_eq!(session.history[4].content, "Recovered");
        assert_eq!(h.provider.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_open_error_leaves_empty_placeholder() {
        let mut h = TestHarness::new();
        h.provider
            .queue_open_error(LlmError::network("connection refused"));

        h.handle.submit("Hello?").unwrap();
        h.wait_for_done().await;

        let session = h.handle.snapshot().await;
        assert_eq!(session.history.len(), 3);
        assert!(session.history[2].content.is_empty());
        assert_eq!(session.action_log.last().unwrap().action, action::ERROR);
    }

    #[tokio::test]
    async fn test_empty_submission_is_ignored() {
        let mut h = TestHarness::new();
        h.provider.queue_deltas(&["ok"]);

        h.handle.submit("   ").unwrap();
        h.handle.submit("real question").unwrap();
        h.wait_for_done().await;

        let session = h.handle.snapshot().await;
        assert_eq!(session.history.len(), 3);
        assert_eq!(session.history[1].content, "real question");
        assert_eq!(h.provider.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_pending_attachments_ride_with_next_submit() {
        let mut h = TestHarness::new();
        h.provider.queue_deltas(&["Nice notes."]);

        let attachment = h
            .handle
            .import_upload(upload("notes.txt", b"cells divide"))
            .unwrap()
            .expect("attachment");
        assert!(h.handle.import_upload(None).unwrap().is_none());

        // Queued right behind the import, no wait in between
        h.handle.submit("").unwrap();
        h.wait_for_done().await;

        let requests = h.provider.recorded_requests();
        assert_eq!(requests[0].attachments, vec![attachment.clone()]);

        let session = h.handle.snapshot().await;
        assert_eq!(session.history[1].attachments, vec![attachment]);
        assert!(session.pending_attachments.is_empty());
        assert!(session
            .action_log
            .iter()
            .any(|e| e.action == action::RESOURCE && e.details == "Imported notes.txt"));
    }

    #[tokio::test]
    async fn test_deep_study_shows_artifact_without_chat() {
        let mut h = TestHarness::new();
        h.provider.queue_deltas(&[
            "<artifact type=\"guide\" title=\"Deep Study: notes.txt\">",
            "1. Cells",
            "</artifact>",
        ]);

        let attachment = h
            .handle
            .load_study(upload("notes.txt", b"cells divide"))
            .unwrap()
            .expect("attachment");
        h.handle.begin_study(attachment).unwrap();
        let events = h.wait_for_done().await;
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::StudyProgress { .. })));

        let session = h.handle.snapshot().await;
        assert_eq!(session.history.len(), 1);
        assert!(session.pending_attachments.is_empty());
        assert_eq!(
            session.displayed_artifact.unwrap().title,
            "Deep Study: notes.txt"
        );

        let actions: Vec<&str> = session.action_log.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(
            actions,
            vec![
                action::SESSION_START,
                action::STUDY_LOAD,
                action::STUDY_START,
                action::STUDY_COMPLETE
            ]
        );

        let request = &h.provider.recorded_requests()[0];
        assert_eq!(request.attachments.len(), 1);
        assert!(request.prompt.contains("Deep Study: notes.txt"));
    }

    #[tokio::test]
    async fn test_deep_study_failure_logs_error() {
        let mut h = TestHarness::new();
        h.provider
            .queue_failure(&["<artifact"], LlmError::stream("truncated"));

        let attachment = h.handle.load_study(upload("bio.pdf", b"%PDF")).unwrap().unwrap();
        h.handle.begin_study(attachment).unwrap();
        h.wait_for_done().await;

        let session = h.handle.snapshot().await;
        assert!(session.displayed_artifact.is_none());
        assert_eq!(
            session.action_log.last().unwrap().details,
            "Deep study analysis failed: truncated"
        );
    }

    #[tokio::test]
    async fn test_close_and_reset() {
        let mut h = TestHarness::new();
        h.provider.queue_deltas(&[
            "<artifact type=\"quiz\" title=\"Quick Quiz\">Q1</artifact>",
        ]);
        h.handle.submit("Quiz me").unwrap();
        h.wait_for_done().await;
        assert!(h.handle.snapshot().await.displayed_artifact.is_some());

        h.handle.close_artifact().unwrap();
        h.wait_for(|e| matches!(e, UiEvent::ArtifactClosed)).await;
        assert!(h.handle.snapshot().await.displayed_artifact.is_none());

        h.handle.reset().unwrap();
        h.wait_for(|e| matches!(e, UiEvent::SessionReset)).await;

        let session = h.handle.snapshot().await;
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history[0].content, DEFAULT_GREETING);
        assert_eq!(session.action_log.first().unwrap().action, action::SESSION_START);
        assert_eq!(session.action_log.last().unwrap().action, action::SESSION_RESET);
    }

    #[tokio::test]
    async fn test_slow_reader_sees_every_update() {
        let mut h = TestHarness::new();
        let deltas: Vec<String> = (0..400).map(|i| format!("{i} ")).collect();
        let delta_refs: Vec<&str> = deltas.iter().map(String::as_str).collect();
        h.provider.queue_deltas(&delta_refs);

        h.handle.submit("Count for me").unwrap();
        // Nothing is read until the whole reply is out
        h.handle.wait_idle().await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = h.events.try_recv() {
            events.push(event);
        }

        let updates = updates(&events);
        assert_eq!(updates.len(), 400);
        assert!(updates.windows(2).all(|w| w[1].starts_with(w[0].as_str())));
        assert_eq!(updates.last().unwrap(), &deltas.concat());
        assert!(matches!(events.last(), Some(UiEvent::Done)));
    }

    #[tokio::test]
    async fn test_study_starts_from_encoded_attachment() {
        let mut h = TestHarness::new();
        h.provider.queue_deltas(&[
            "<artifact type=\"analysis\" title=\"Deep Study: lab.txt\">pH is neutral</artifact>",
        ]);

        let attachment = attachment::encode(upload("lab.txt", b"pH 7")).expect("attachment");
        h.handle.begin_study(attachment.clone()).unwrap();
        h.wait_for_done().await;

        let session = h.handle.snapshot().await;
        assert_eq!(
            session.displayed_artifact.unwrap().kind,
            ArtifactKind::Analysis
        );
        let actions: Vec<&str> = session.action_log.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(
            actions,
            vec![
                action::SESSION_START,
                action::STUDY_START,
                action::STUDY_COMPLETE
            ]
        );
        assert_eq!(h.provider.recorded_requests()[0].attachments, vec![attachment]);
    }

    #[tokio::test]
    async fn test_loaded_study_waits_for_begin() {
        let mut h = TestHarness::new();
        h.provider.queue_deltas(&["Hi again"]);

        h.handle
            .load_study(upload("draft.txt", b"chapter one"))
            .unwrap()
            .expect("attachment");
        assert!(h.handle.load_study(None).unwrap().is_none());
        h.handle.submit("hello").unwrap();
        h.wait_for_done().await;

        // The study file neither started an analysis nor joined the chat
        let requests = h.provider.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].attachments.is_empty());

        let session = h.handle.snapshot().await;
        assert!(session
            .action_log
            .iter()
            .any(|e| e.action == action::STUDY_LOAD));
        assert!(session
            .action_log
            .iter()
            .all(|e| e.action != action::STUDY_START));
    }

    #[tokio::test]
    async fn test_wait_idle_holds_until_reply_finishes() {
        let h = TestHarness::new();
        h.handle.wait_idle().await.unwrap();

        let gate = h.provider.queue_gated(&["slow ", "answer"]);
        h.handle.submit("Take your time").unwrap();

        let handle = h.handle.clone();
        let waiter = tokio::spawn(async move { handle.wait_idle().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        gate.notify_one();
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("timed out waiting for idle")
            .unwrap()
            .unwrap();
        assert_eq!(h.handle.snapshot().await.history[2].content, "slow answer");
    }

    #[tokio::test]
    async fn test_runtime_stops_after_last_handle_drops() {
        let mut h = TestHarness::new();
        let gate = h.provider.queue_gated(&["still ", "here"]);

        h.handle.submit("Last words").unwrap();
        h.wait_for(|e| matches!(e, UiEvent::StateChanged { state } if state.is_busy()))
            .await;

        let TestHarness {
            handle, mut events, ..
        } = h;
        drop(handle);
        gate.notify_one();

        // The in-flight reply still finishes, then the subscriber closes
        let seen = tokio::time::timeout(Duration::from_secs(5), async {
            let mut seen = Vec::new();
            while let Some(event) = events.recv().await {
                seen.push(event);
            }
            seen
        })
        .await
        .expect("runtime kept running");

        assert_eq!(updates(&seen).last().map(String::as_str), Some("still here"));
        assert!(matches!(seen.last(), Some(UiEvent::Done)));
    }
}
