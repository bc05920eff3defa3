//! Session state types

use crate::diagnosis::Candidate;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// ============================================================================
// Candidate Queue
// ============================================================================

/// Ranked candidates still open for confirmation.
///
/// Never empty: the front is the candidate currently presented to the user.
/// Order is the ranking service's order and is never changed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Candidate>", into = "Vec<Candidate>")]
pub struct CandidateQueue {
    candidates: VecDeque<Candidate>,
}

impl CandidateQueue {
    /// Build a queue from a ranked list; `None` when the list is empty
    pub fn new(candidates: Vec<Candidate>) -> Option<Self> {
        if candidates.is_empty() {
            None
        } else {
            Some(Self {
                candidates: candidates.into(),
            })
        }
    }

    /// The candidate under consideration
    pub fn front(&self) -> &Candidate {
        &self.candidates[0]
    }

    /// Drop the front candidate; `None` once the queue is exhausted
    #[must_use]
    pub fn advance(mut self) -> Option<Self> {
        self.candidates.pop_front();
        if self.candidates.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }
}

impl TryFrom<Vec<Candidate>> for CandidateQueue {
    type Error = &'static str;

    fn try_from(candidates: Vec<Candidate>) -> Result<Self, Self::Error> {
        Self::new(candidates).ok_or("candidate queue cannot be empty")
    }
}

impl From<CandidateQueue> for Vec<Candidate> {
    fn from(queue: CandidateQueue) -> Self {
        queue.candidates.into()
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Session state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionState {
    /// Ready for a symptom description, no candidates pending
    #[default]
    Idle,

    /// Retrieval request in flight
    Retrieving {
        /// Matches the response to the request that is still wanted
        request_id: String,
        query: String,
    },

    /// A candidate is presented and awaits the user's verdict
    AwaitingConfirmation { queue: CandidateQueue },
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::Retrieving { .. } => SessionPhase::Retrieving,
            SessionState::AwaitingConfirmation { .. } => SessionPhase::AwaitingConfirmation,
        }
    }

    /// True while a retrieval is outstanding
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Retrieving { .. })
    }

    /// The candidate currently presented, if any
    pub fn current_candidate(&self) -> Option<&Candidate> {
        match self {
            SessionState::AwaitingConfirmation { queue } => Some(queue.front()),
            SessionState::Idle | SessionState::Retrieving { .. } => None,
        }
    }
}

/// Coarse view of the state for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Retrieving,
    AwaitingConfirmation,
}

// ============================================================================
// Session Context
// ============================================================================

/// What to do with a query submitted while a retrieval is still in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Refuse the new query; the outstanding one completes
    #[default]
    Reject,
    /// Abort the outstanding retrieval and start the new one
    CancelAndReplace,
}

/// Context for a session (immutable configuration)
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub overlap_policy: OverlapPolicy,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            overlap_policy: OverlapPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }
}
