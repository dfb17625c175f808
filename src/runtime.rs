//! Runtime for executing conversations
//!
//! One task per conversation owns the state machine and applies effects to
//! the session. Front ends talk to it through a [`ConversationHandle`] and
//! watch it through per-subscriber queues of [`UiEvent`]s.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;

use crate::artifact::Artifact;
use crate::attachment::{self, Attachment, FileUpload};
use crate::llm::CompletionProvider;
use crate::session::{ActionLogEntry, Message, Session};
use crate::state_machine::{ConvContext, ConvState, Event, ImportPurpose};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, RwLock};

/// Events sent to UI observers
#[derive(Debug, Clone)]
pub enum UiEvent {
    MessageAppended { message: Message },
    /// Full current content, not a delta
    MessageUpdated { message_id: String, content: String },
    StudyProgress { chars: usize },
    ArtifactShown { artifact: Artifact },
    ArtifactClosed,
    Logged { entry: ActionLogEntry },
    StateChanged { state: ConvState },
    SessionReset,
    /// The in-flight request finished and the busy flag is clear
    Done,
}

/// Everything the runtime loop receives, in one ordered queue
#[derive(Debug)]
pub enum Inbound {
    Event(Event),
    /// Register an observer; it sees every UI event from here on
    Subscribe(mpsc::UnboundedSender<UiEvent>),
    /// Answered once nothing is in flight
    WaitIdle(oneshot::Sender<()>),
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Conversation runtime has stopped")]
    Stopped,
}

/// Handle to interact with a running conversation.
///
/// The runtime stops once every handle is dropped and no completion is
/// streaming.
#[derive(Clone)]
pub struct ConversationHandle {
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    session: Arc<RwLock<Session>>,
}

/// Start a conversation runtime on the current tokio runtime
pub fn spawn_conversation<P>(
    context: ConvContext,
    provider: Arc<P>,
    session: Session,
) -> ConversationHandle
where
    P: CompletionProvider + 'static,
{
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let session = Arc::new(RwLock::new(session));

    let runtime = ConversationRuntime::new(
        context,
        Arc::clone(&session),
        provider,
        inbound_rx,
        inbound_tx.downgrade(),
    );
    tokio::spawn(runtime.run());

    ConversationHandle {
        inbound_tx,
        session,
    }
}

impl ConversationHandle {
    fn send(&self, event: Event) -> Result<(), RuntimeError> {
        self.inbound_tx
            .send(Inbound::Event(event))
            .map_err(|_| RuntimeError::Stopped)
    }

    /// Send a chat message. Pending attachments ride along.
    ///
    /// Ignored while a request is in flight or when there is nothing to send.
    pub fn submit(&self, text: impl Into<String>) -> Result<(), RuntimeError> {
        self.send(Event::UserSubmit {
            text: text.into(),
            attachments: Vec::new(),
            request_id: new_id(),
            user_message_id: new_id(),
            assistant_message_id: new_id(),
            timestamp: Utc::now(),
        })
    }

    /// Add an upload to the pending attachments. No upload is a no-op.
    pub fn import_upload(
        &self,
        upload: Option<FileUpload>,
    ) -> Result<Option<Attachment>, RuntimeError> {
        let Some(attachment) = attachment::encode(upload) else {
            return Ok(None);
        };
        self.send(Event::AttachmentImported {
            attachment: attachment.clone(),
            purpose: ImportPurpose::Chat,
        })?;
        Ok(Some(attachment))
    }

    /// Encode an upload for deep study and log it. Nothing is analyzed until
    /// [`begin_study`](Self::begin_study). No upload is a no-op.
    pub fn load_study(
        &self,
        upload: Option<FileUpload>,
    ) -> Result<Option<Attachment>, RuntimeError> {
        let Some(attachment) = attachment::encode(upload) else {
            return Ok(None);
        };
        self.send(Event::AttachmentImported {
            attachment: attachment.clone(),
            purpose: ImportPurpose::Study,
        })?;
        Ok(Some(attachment))
    }

    /// Start a deep analysis of an encoded attachment.
    ///
    /// Ignored while a request is in flight.
    pub fn begin_study(&self, attachment: Attachment) -> Result<(), RuntimeError> {
        self.send(Event::StudyRequested {
            attachment,
            request_id: new_id(),
        })
    }

    pub fn close_artifact(&self) -> Result<(), RuntimeError> {
        self.send(Event::CloseArtifact)
    }

    /// Clear the conversation. Ignored while a request is in flight.
    pub fn reset(&self) -> Result<(), RuntimeError> {
        self.send(Event::Reset)
    }

    /// Every UI event from now on, in order and without loss. The receiver
    /// closes when the runtime stops.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UiEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        // A stopped runtime drops `tx`, which closes `rx`
        let _ = self.inbound_tx.send(Inbound::Subscribe(tx));
        rx
    }

    /// Resolves once everything sent so far is processed and no request is
    /// in flight
    pub async fn wait_idle(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.inbound_tx
            .send(Inbound::WaitIdle(tx))
            .map_err(|_| RuntimeError::Stopped)?;
        rx.await.map_err(|_| RuntimeError::Stopped)
    }

    /// Copy of the session as it stands
    pub async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
