//! Effects produced by state transitions

use crate::conversation::ConversationTurn;
use crate::diagnosis::Candidate;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a turn to the conversation log
    AppendTurn(ConversationTurn),

    /// Ask the ranking service for candidates (spawns as background task)
    RetrieveCandidates { request_id: String, query: String },

    /// Abort the currently running retrieval
    AbortRetrieval,

    /// Report the user's verdict; detached, never awaited
    ReportFeedback {
        candidate_name: String,
        is_correct: bool,
    },
}

impl Effect {
    pub fn user_text(text: impl Into<String>) -> Self {
        Effect::AppendTurn(ConversationTurn::user(text))
    }

    pub fn system_text(text: impl Into<String>) -> Self {
        Effect::AppendTurn(ConversationTurn::system(text))
    }

    pub fn present(candidate: &Candidate) -> Self {
        Effect::AppendTurn(ConversationTurn::presented(candidate.clone()))
    }

    pub fn retrieve(request_id: impl Into<String>, query: impl Into<String>) -> Self {
        Effect::RetrieveCandidates {
            request_id: request_id.into(),
            query: query.into(),
        }
    }
}
