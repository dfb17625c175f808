//! Conversation runtime executor

use super::{Inbound, UiEvent};

use crate::accumulator::accumulate;
use crate::llm::{CompletionProvider, CompletionRequest};
use crate::session::Session;
use crate::state_machine::{transition, ConvContext, ConvState, Effect, Event};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};

/// Conversation runtime generic over the completion provider
pub struct ConversationRuntime<P>
where
    P: CompletionProvider + 'static,
{
    context: ConvContext,
    state: ConvState,
    /// Shared with handles for reading; only this runtime writes
    session: Arc<RwLock<Session>>,
    provider: Arc<P>,
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,
    /// Weak so that dropping every handle ends the loop
    inbound_tx: mpsc::WeakUnboundedSender<Inbound>,
    subscribers: Vec<mpsc::UnboundedSender<UiEvent>>,
    idle_waiters: Vec<oneshot::Sender<()>>,
}

impl<P> ConversationRuntime<P>
where
    P: CompletionProvider + 'static,
{
    pub fn new(
        context: ConvContext,
        session: Arc<RwLock<Session>>,
        provider: Arc<P>,
        inbound_rx: mpsc::UnboundedReceiver<Inbound>,
        inbound_tx: mpsc::WeakUnboundedSender<Inbound>,
    ) -> Self {
        Self {
            context,
            state: ConvState::Idle,
            session,
            provider,
            inbound_rx,
            inbound_tx,
            subscribers: Vec::new(),
            idle_waiters: Vec::new(),
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            conv_id = %self.context.conversation_id,
            model = %self.context.model_id,
            "Starting conversation runtime"
        );

        // One event at a time: the busy check and its set happen together
        while let Some(inbound) = self.inbound_rx.recv().await {
            match inbound {
                Inbound::Event(event) => self.process_event(event).await,
                Inbound::Subscribe(tx) => self.subscribers.push(tx),
                Inbound::WaitIdle(tx) => {
                    self.idle_waiters.push(tx);
                    self.release_idle_waiters();
                }
            }
        }

        tracing::info!(conv_id = %self.context.conversation_id, "Conversation runtime stopped");
    }

    async fn process_event(&mut self, event: Event) {
        let event = self.with_pending_attachments(event).await;
        let kind = event.kind();

        let result = match transition(&self.state, event) {
            Ok(r) => r,
            Err(e) if e.is_silent() => {
                tracing::debug!(event = kind, state = self.state.name(), reason = %e, "Event ignored");
                return;
            }
            Err(e) => {
                tracing::warn!(
                    event = kind,
                    state = self.state.name(),
                    in_flight = ?self.state.request_id(),
                    error = %e,
                    "Event rejected"
                );
                return;
            }
        };

        let old_state = std::mem::replace(&mut self.state, result.new_state);
        if old_state != self.state {
            tracing::debug!(from = old_state.name(), to = self.state.name(), "State changed");
            self.broadcast(UiEvent::StateChanged {
                state: self.state.clone(),
            });
        }

        for effect in result.effects {
            self.execute_effect(effect).await;
        }
        self.release_idle_waiters();
    }

    fn release_idle_waiters(&mut self) {
        if self.state.is_busy() {
            return;
        }
        for waiter in self.idle_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    /// A submission carries whatever is pending at the moment it is
    /// processed, ahead of anything it brought itself.
    async fn with_pending_attachments(&self, mut event: Event) -> Event {
        if self.state.is_busy() {
            return event;
        }
        if let Event::UserSubmit { attachments, .. } = &mut event {
            let pending = self.session.read().await.pending_attachments.clone();
            if !pending.is_empty() {
                attachments.splice(0..0, pending);
            }
        }
        event
    }

    /// Queue an event for every live subscriber
    fn broadcast(&mut self, event: UiEvent) {
        self.subscribers.retain(|tx| !tx.is_closed());
        if let Some((last, rest)) = self.subscribers.split_last() {
            for tx in rest {
                let _ = tx.send(event.clone());
            }
            let _ = last.send(event);
        }
    }

    /// Execute an effect against the session or the outside world
    async fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendMessage { message } => {
                let appended = self.session.write().await.append(message.clone());
                if appended {
                    self.broadcast(UiEvent::MessageAppended { message });
                }
            }

            Effect::UpdateMessage {
                message_id,
                content,
            } => {
                {
                    let mut session = self.session.write().await;
                    let Some(message) = session.message_mut(&message_id) else {
                        tracing::warn!(message_id = %message_id, "Update for unknown message");
                        return;
                    };
                    message.content.clone_from(&content);
                }
                self.broadcast(UiEvent::MessageUpdated {
                    message_id,
                    content,
                });
            }

            Effect::LinkArtifact {
                message_id,
                artifact_id,
            } => {
                let mut session = self.session.write().await;
                if let Some(message) = session.message_mut(&message_id) {
                    message.artifact_id = Some(artifact_id);
                }
            }

            Effect::AddPendingAttachment { attachment } => {
                self.session
                    .write()
                    .await
                    .pending_attachments
                    .push(attachment);
            }

            Effect::ClearPendingAttachments => {
                self.session.write().await.pending_attachments.clear();
            }

            Effect::RequestCompletion {
                request_id,
                request,
            } => {
                self.spawn_completion(request_id, request);
            }

            Effect::NotifyStudyProgress { chars } => {
                self.broadcast(UiEvent::StudyProgress { chars });
            }

            Effect::ShowArtifact { artifact } => {
                tracing::info!(
                    artifact_id = %artifact.id,
                    kind = %artifact.kind,
                    title = %artifact.title,
                    "Artifact extracted"
                );
                self.session.write().await.displayed_artifact = Some(artifact.clone());
                self.broadcast(UiEvent::ArtifactShown { artifact });
            }

            Effect::CloseArtifact => {
                self.session.write().await.displayed_artifact = None;
                self.broadcast(UiEvent::ArtifactClosed);
            }

            Effect::Log { action, details } => {
                let entry = self.session.write().await.log(action, details).clone();
                self.broadcast(UiEvent::Logged { entry });
            }

            Effect::ResetSession => {
                let entry = {
                    let mut session = self.session.write().await;
                    session.reset();
                    session.action_log.last().cloned()
                };
                self.broadcast(UiEvent::SessionReset);
                if let Some(entry) = entry {
                    self.broadcast(UiEvent::Logged { entry });
                }
            }

            Effect::NotifyDone => {
                self.broadcast(UiEvent::Done);
            }
        }
    }

    /// Stream the completion in the background. Every cumulative string and
    /// the final outcome come back through the event channel, so the runtime
    /// loop stays the only writer.
    fn spawn_completion(&self, request_id: String, request: CompletionRequest) {
        // Every handle is gone, so nobody is left to read the reply
        let Some(inbound_tx) = self.inbound_tx.upgrade() else {
            tracing::warn!(request_id = %request_id, "Runtime shutting down, completion skipped");
            return;
        };
        let provider = Arc::clone(&self.provider);
        let conv_id = self.context.conversation_id.clone();

        tokio::spawn(async move {
            tracing::info!(conv_id = %conv_id, request_id = %request_id, "Requesting completion");

            let event = match provider.stream(&request).await {
                Ok(stream) => {
                    let publish_tx = inbound_tx.clone();
                    let publish_id = request_id.clone();
                    let mut sink = move |content: &str| {
                        let _ = publish_tx.send(Inbound::Event(Event::ContentPublished {
                            request_id: publish_id.clone(),
                            content: content.to_string(),
                        }));
                    };

                    match accumulate(stream, &mut sink).await {
                        Ok(text) => Event::StreamComplete {
                            request_id,
                            text,
                            artifact_id: uuid::Uuid::new_v4().to_string(),
                        },
                        Err(failure) => {
                            tracing::warn!(
                                conv_id = %conv_id,
                                partial_chars = failure.partial.len(),
                                error = %failure.error,
                                "Completion stream failed"
                            );
                            Event::StreamFailed {
                                request_id,
                                message: failure.error.to_string(),
                            }
                        }
                    }
                }
                Err(e) => Event::StreamFailed {
                    request_id,
                    message: e.to_string(),
                },
            };

            let _ = inbound_tx.send(Inbound::Event(event));
        });
    }
}
