//! Pure state transition function

use super::event::ImportPurpose;
use super::{ConvState, Effect, Event};
use crate::artifact;
use crate::session::{action, Message};
use crate::system_prompt::{chat_request, study_request};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A request is already in flight")]
    Busy,
    #[error("Nothing to send")]
    EmptySubmission,
    #[error("Stream event for {0} does not match the in-flight request")]
    StaleStream(String),
}

impl TransitionError {
    /// Rejections that are policy, not failure: dropped without a log entry
    pub fn is_silent(&self) -> bool {
        matches!(self, TransitionError::Busy | TransitionError::EmptySubmission)
    }
}

/// Pure transition function
///
/// Given the same inputs, it always produces the same outputs, with no I/O.
#[allow(clippy::too_many_lines)]
pub fn transition(state: &ConvState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Chat submission
        // ============================================================
        (
            ConvState::Idle,
            Event::UserSubmit {
                text,
                attachments,
                request_id,
                user_message_id,
                assistant_message_id,
                timestamp,
            },
        ) => {
            if text.trim().is_empty() && attachments.is_empty() {
                return Err(TransitionError::EmptySubmission);
            }

            let request = chat_request(&text, attachments.clone());
            let user = Message::user(user_message_id, text, attachments, timestamp);
            let placeholder = Message::assistant(assistant_message_id.clone(), "", timestamp);

            Ok(TransitionResult::new(ConvState::AwaitingResponse {
                request_id: request_id.clone(),
                assistant_message_id,
            })
            .with_effect(Effect::append_message(user))
            .with_effect(Effect::ClearPendingAttachments)
            .with_effect(Effect::append_message(placeholder))
            .with_effect(Effect::RequestCompletion {
                request_id,
                request,
            }))
        }

        // Busy + anything that would start a request -> Reject
        (
            ConvState::AwaitingResponse { .. } | ConvState::Studying { .. },
            Event::UserSubmit { .. } | Event::StudyRequested { .. } | Event::Reset,
        ) => Err(TransitionError::Busy),

        // ============================================================
        // Imports are accepted in any state
        // ============================================================
        (state, Event::AttachmentImported { attachment, purpose }) => match purpose {
            ImportPurpose::Chat => {
                let details = format!("Imported {}", attachment.name);
                Ok(TransitionResult::new(state.clone())
                    .with_effect(Effect::AddPendingAttachment { attachment })
                    .with_effect(Effect::log(action::RESOURCE, details)))
            }
            ImportPurpose::Study => Ok(TransitionResult::new(state.clone()).with_effect(
                Effect::log(
                    action::STUDY_LOAD,
                    format!("Uploaded {} for deep analysis.", attachment.name),
                ),
            )),
        },

        // ============================================================
        // Deep study
        // ============================================================
        (
            ConvState::Idle,
            Event::StudyRequested {
                attachment,
                request_id,
            },
        ) => {
            let attachment_name = attachment.name.clone();
            let details = format!("Lisa is analyzing {attachment_name}...");

            Ok(TransitionResult::new(ConvState::Studying {
                request_id: request_id.clone(),
                attachment_name,
            })
            .with_effect(Effect::log(action::STUDY_START, details))
            .with_effect(Effect::RequestCompletion {
                request_id,
                request: study_request(attachment),
            }))
        }

        // ============================================================
        // Streaming progress
        // ============================================================
        (
            ConvState::AwaitingResponse {
                request_id: current,
                assistant_message_id,
            },
            Event::ContentPublished {
                request_id,
                content,
            },
        ) if *current == request_id => Ok(TransitionResult::new(state.clone()).with_effect(
            Effect::UpdateMessage {
                message_id: assistant_message_id.clone(),
                content,
            },
        )),

        (
            ConvState::Studying {
                request_id: current,
                ..
            },
            Event::ContentPublished {
                request_id,
                content,
            },
        ) if *current == request_id => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::NotifyStudyProgress {
                chars: content.chars().count(),
            })),

        // ============================================================
        // Stream completion
        // ============================================================
        (
            ConvState::AwaitingResponse {
                request_id: current,
                assistant_message_id,
            },
            Event::StreamComplete {
                request_id,
                text,
                artifact_id,
            },
        ) if *current == request_id => {
            let effects = match artifact::extract(&text) {
                Some(extraction) => {
                    let display_text = extraction.display_text.clone();
                    vec![
                        Effect::UpdateMessage {
                            message_id: assistant_message_id.clone(),
                            content: display_text,
                        },
                        Effect::LinkArtifact {
                            message_id: assistant_message_id.clone(),
                            artifact_id: artifact_id.clone(),
                        },
                        Effect::ShowArtifact {
                            artifact: extraction.into_artifact(artifact_id),
                        },
                    ]
                }
                None => vec![],
            };

            Ok(TransitionResult::new(ConvState::Idle)
                .with_effects(effects)
                .with_effect(Effect::NotifyDone))
        }

        (
            ConvState::Studying {
                request_id: current,
                attachment_name,
            },
            Event::StreamComplete {
                request_id,
                text,
                artifact_id,
            },
        ) if *current == request_id => {
            let effects = match artifact::extract(&text) {
                Some(extraction) => vec![
                    Effect::ShowArtifact {
                        artifact: extraction.into_artifact(artifact_id),
                    },
                    Effect::log(
                        action::STUDY_COMPLETE,
                        format!("Deep analysis for {attachment_name} generated."),
                    ),
                ],
                None => vec![],
            };

            Ok(TransitionResult::new(ConvState::Idle)
                .with_effects(effects)
                .with_effect(Effect::NotifyDone))
        }

        // ============================================================
        // Stream failure: keep partial content, log, back to idle
        // ============================================================
        (
            ConvState::AwaitingResponse {
                request_id: current,
                ..
            },
            Event::StreamFailed {
                request_id,
                message,
            },
        ) if *current == request_id => Ok(TransitionResult::new(ConvState::Idle)
            .with_effect(Effect::log(
                action::ERROR,
                format!("Processing failed: {message}"),
            ))
            .with_effect(Effect::NotifyDone)),

        (
            ConvState::Studying {
                request_id: current,
                ..
            },
            Event::StreamFailed {
                request_id,
                message,
            },
        ) if *current == request_id => Ok(TransitionResult::new(ConvState::Idle)
            .with_effect(Effect::log(
                action::ERROR,
                format!("Deep study analysis failed: {message}"),
            ))
            .with_effect(Effect::NotifyDone)),

        // Stream events for a request that is not in flight
        (
            _,
            Event::ContentPublished { request_id, .. }
            | Event::StreamComplete { request_id, .. }
            | Event::StreamFailed { request_id, .. },
        ) => Err(TransitionError::StaleStream(request_id)),

        // ============================================================
        // Artifact display and reset
        // ============================================================
        (state, Event::CloseArtifact) => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::CloseArtifact))
        }

        (ConvState::Idle, Event::Reset) => {
            Ok(TransitionResult::new(ConvState::Idle).with_effect(Effect::ResetSession))
        }
    }
}
