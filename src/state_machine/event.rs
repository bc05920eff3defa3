//! Events that can occur in a session

use crate::diagnosis::{Candidate, RetrievalError};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    QuerySubmitted {
        text: String,
        /// Fresh id per submission, echoed back by the retrieval result
        request_id: String,
    },
    Confirmation {
        accepted: bool,
    },
    UserCancel,

    // Retrieval events
    CandidatesRetrieved {
        request_id: String,
        candidates: Vec<Candidate>,
    },
    RetrievalFailed {
        request_id: String,
        error: RetrievalError,
    },
}

impl Event {
    /// A query event with a freshly generated request id
    pub fn query(text: impl Into<String>) -> Self {
        Event::QuerySubmitted {
            text: text.into(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}
