//! API request and response types

use crate::conversation::ConversationTurn;
use crate::state_machine::SessionState;
use serde::{Deserialize, Serialize};

/// A log entry with its 1-based position
#[derive(Debug, Clone, Serialize)]
pub struct TurnEntry {
    pub sequence: usize,
    #[serde(flatten)]
    pub turn: ConversationTurn,
}

impl TurnEntry {
    pub fn numbered(turns: Vec<ConversationTurn>) -> Vec<Self> {
        turns
            .into_iter()
            .enumerate()
            .map(|(i, turn)| Self {
                sequence: i + 1,
                turn,
            })
            .collect()
    }
}

impl From<(usize, ConversationTurn)> for TurnEntry {
    fn from((sequence, turn): (usize, ConversationTurn)) -> Self {
        Self { sequence, turn }
    }
}

/// Response for session creation
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

/// Full view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub state: SessionState,
    pub loading: bool,
    pub turns: Vec<TurnEntry>,
}

/// Turns newer than a given sequence number
#[derive(Debug, Serialize)]
pub struct TurnsResponse {
    pub turns: Vec<TurnEntry>,
}

#[derive(Debug, Deserialize)]
pub struct TurnsQuery {
    #[serde(default)]
    pub after: usize,
}

/// Request to submit a symptom description
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub text: String,
}

/// Request to accept or reject the presented candidate
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub accepted: bool,
}

/// Response for actions the session accepted
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

/// Response for cancel action
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub ok: bool,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Coordinates for a weather lookup; both or neither
#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
