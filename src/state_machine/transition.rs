//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! new state and effects. All I/O happens in the runtime.

use super::state::{CandidateQueue, OverlapPolicy};
use super::{Effect, Event, SessionContext, SessionState};
use thiserror::Error;

pub const NO_MATCH_TEXT: &str = "I'm sorry, I couldn't find a clear match based on your \
     description. Please describe it differently or add more details about the symptoms.";

pub const CLOSING_TEXT: &str = "Great! Glad I could help. Follow the recommendations provided \
     and monitor your crops regularly.";

pub const NEXT_CANDIDATE_TEXT: &str = "Okay, let me suggest another possibility...";

pub const EXHAUSTED_TEXT: &str = "I'm sorry, I don't have any other matches. My knowledge is \
     still growing. Please consider consulting a local extension officer for expert advice.";

pub const CANCELLED_TEXT: &str = "Okay, I've stopped that search. Describe the symptoms again \
     whenever you're ready.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    /// Leave the state as it was and do nothing
    pub fn unchanged(state: &SessionState) -> Self {
        Self::new(state.clone())
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn is_noop(&self, previous: &SessionState) -> bool {
        self.effects.is_empty() && &self.new_state == previous
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Still looking into the previous description, please wait for it to finish")]
    SessionBusy,
}

/// Pure transition function
pub fn transition(
    state: &SessionState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Query submission
        // ============================================================

        // Blank input never reaches the log or the service
        (_, Event::QuerySubmitted { text, .. }) if text.trim().is_empty() => {
            Ok(TransitionResult::unchanged(state))
        }

        (SessionState::Retrieving { .. }, Event::QuerySubmitted { text, request_id }) => {
            match context.overlap_policy {
                OverlapPolicy::Reject => Err(TransitionError::SessionBusy),
                OverlapPolicy::CancelAndReplace => Ok(TransitionResult::new(
                    SessionState::Retrieving {
                        request_id: request_id.clone(),
                        query: text.clone(),
                    },
                )
                .with_effect(Effect::AbortRetrieval)
                .with_effect(Effect::user_text(text.clone()))
                .with_effect(Effect::retrieve(request_id, text))),
            }
        }

        // Idle or AwaitingConfirmation: any pending queue is abandoned
        (
            SessionState::Idle | SessionState::AwaitingConfirmation { .. },
            Event::QuerySubmitted { text, request_id },
        ) => Ok(TransitionResult::new(SessionState::Retrieving {
            request_id: request_id.clone(),
            query: text.clone(),
        })
        .with_effect(Effect::user_text(text.clone()))
        .with_effect(Effect::retrieve(request_id, text))),

        // ============================================================
        // Retrieval outcome
        // ============================================================

        (
            SessionState::Retrieving { request_id, .. },
            Event::CandidatesRetrieved {
                request_id: result_id,
                candidates,
            },
        ) if *request_id == result_id => match CandidateQueue::new(candidates) {
            Some(queue) => {
                let present = Effect::present(queue.front());
                Ok(
                    TransitionResult::new(SessionState::AwaitingConfirmation { queue })
                        .with_effect(present),
                )
            }
            None => Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::system_text(NO_MATCH_TEXT))),
        },

        (
            SessionState::Retrieving { request_id, .. },
            Event::RetrievalFailed {
                request_id: result_id,
                error,
            },
        ) if *request_id == result_id => Ok(TransitionResult::new(SessionState::Idle)
            .with_effect(Effect::system_text(error.user_message()))),

        // Results for a cancelled or replaced request are dropped
        (_, Event::CandidatesRetrieved { .. } | Event::RetrievalFailed { .. }) => {
            Ok(TransitionResult::unchanged(state))
        }

        // ============================================================
        // Confirmation
        // ============================================================

        (SessionState::AwaitingConfirmation { queue }, Event::Confirmation { accepted: true }) => {
            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::system_text(CLOSING_TEXT))
                .with_effect(Effect::ReportFeedback {
                    candidate_name: queue.front().name.clone(),
                    is_correct: true,
                }))
        }

        (SessionState::AwaitingConfirmation { queue }, Event::Confirmation { accepted: false }) => {
            match queue.clone().advance() {
                Some(next) => {
                    let present = Effect::present(next.front());
                    Ok(
                        TransitionResult::new(SessionState::AwaitingConfirmation { queue: next })
                            .with_effect(Effect::system_text(NEXT_CANDIDATE_TEXT))
                            .with_effect(present),
                    )
                }
                None => Ok(TransitionResult::new(SessionState::Idle)
                    .with_effect(Effect::system_text(EXHAUSTED_TEXT))),
            }
        }

        // Nothing presented, nothing to confirm
        (SessionState::Idle | SessionState::Retrieving { .. }, Event::Confirmation { .. }) => {
            Ok(TransitionResult::unchanged(state))
        }

        // ============================================================
        // Cancellation
        // ============================================================

        (SessionState::Retrieving { .. }, Event::UserCancel) => {
            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::AbortRetrieval)
                .with_effect(Effect::system_text(CANCELLED_TEXT)))
        }

        (SessionState::Idle | SessionState::AwaitingConfirmation { .. }, Event::UserCancel) => {
            Ok(TransitionResult::unchanged(state))
        }
    }
}
