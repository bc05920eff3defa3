//! Retrieval error types

use thiserror::Error;

const CONNECTION_TROUBLE: &str = "Sorry, I had trouble connecting to the diagnostic server. \
     Please check your connection and try again.";

/// Retrieval error with classification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RetrievalError {
    pub kind: RetrievalErrorKind,
    pub message: String,
}

impl RetrievalError {
    pub fn new(kind: RetrievalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RetrievalErrorKind::Network, message)
    }

    pub fn service(status_code: u16, message: impl Into<String>) -> Self {
        Self::new(RetrievalErrorKind::Service { status_code }, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(RetrievalErrorKind::MalformedResponse, message)
    }

    /// Text shown to the user in the conversation log.
    ///
    /// An explicit error payload from the service is echoed back; everything
    /// else is reported as a connection problem.
    pub fn user_message(&self) -> String {
        match self.kind {
            RetrievalErrorKind::Service { status_code } if (200..300).contains(&status_code) => {
                format!(
                    "Error: {}. Please try again with a clearer description.",
                    self.message
                )
            }
            RetrievalErrorKind::Network
            | RetrievalErrorKind::Service { .. }
            | RetrievalErrorKind::MalformedResponse => CONNECTION_TROUBLE.to_string(),
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalErrorKind {
    /// Transport failure, connection refused, timeout
    Network,
    /// Non-2xx status, or a 2xx body carrying an `error` field
    Service { status_code: u16 },
    /// Body was not JSON or lacked required candidate fields
    MalformedResponse,
}
