//! Conversation log
//!
//! Append-only record of what the user and the agronomist said. Turns are
//! numbered from 1 in append order; a turn is never edited or removed.

use crate::diagnosis::Candidate;
use serde::{Deserialize, Serialize};

/// Opening line of every new session
pub const GREETING: &str = "Hello! I'm your AI Agronomist. Describe what you see on your crops \
     (e.g., \"Yellow spots on maize leaves with ragged holes\").";

/// One entry in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationTurn {
    UserText { text: String },
    SystemText { text: String },
    PresentedCandidate { candidate: Candidate },
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        ConversationTurn::UserText { text: text.into() }
    }

    pub fn system(text: impl Into<String>) -> Self {
        ConversationTurn::SystemText { text: text.into() }
    }

    pub fn presented(candidate: Candidate) -> Self {
        ConversationTurn::PresentedCandidate { candidate }
    }

    /// Text of a user or system turn
    pub fn text(&self) -> Option<&str> {
        match self {
            ConversationTurn::UserText { text } | ConversationTurn::SystemText { text } => {
                Some(text)
            }
            ConversationTurn::PresentedCandidate { .. } => None,
        }
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            ConversationTurn::PresentedCandidate { candidate } => Some(candidate),
            ConversationTurn::UserText { .. } | ConversationTurn::SystemText { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log opened with the agronomist greeting
    pub fn with_greeting() -> Self {
        let mut log = Self::new();
        log.append(ConversationTurn::system(GREETING));
        log
    }

    /// Append a turn and return its sequence number
    pub fn append(&mut self, turn: ConversationTurn) -> usize {
        self.turns.push(turn);
        self.turns.len()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Oldest first. Each call starts again from the beginning.
    pub fn iter(&self) -> impl Iterator<Item = &ConversationTurn> + '_ {
        self.turns.iter()
    }

    /// Turns with a sequence number greater than `sequence`
    pub fn after(&self, sequence: usize) -> &[ConversationTurn] {
        self.turns.get(sequence..).unwrap_or(&[])
    }
}
