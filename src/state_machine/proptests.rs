//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::conversation::ConversationTurn;
use crate::diagnosis::{Candidate, ConfidenceLevel, RetrievalError};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SessionContext {
    SessionContext::new("test-session")
}

/// Applies transitions and effects the way the runtime does, minus the I/O
#[derive(Default)]
struct Sim {
    state: SessionState,
    log: Vec<ConversationTurn>,
    retrievals: Vec<(String, String)>,
    feedback: Vec<(String, bool)>,
}

impl Sim {
    fn apply(&mut self, context: &SessionContext, event: Event) -> Result<(), TransitionError> {
        let result = transition(&self.state, context, event)?;
        self.state = result.new_state;
        for effect in result.effects {
            match effect {
                Effect::AppendTurn(turn) => self.log.push(turn),
                Effect::RetrieveCandidates { request_id, query } => {
                    self.retrievals.push((request_id, query));
                }
                Effect::ReportFeedback {
                    candidate_name,
                    is_correct,
                } => self.feedback.push((candidate_name, is_correct)),
                Effect::AbortRetrieval => {}
            }
        }
        Ok(())
    }

    /// Submit a query and answer it with `candidates`
    fn query_answered(&mut self, text: &str, candidates: Vec<Candidate>) {
        let context = test_context();
        self.apply(
            &context,
            Event::QuerySubmitted {
                text: text.to_string(),
                request_id: "req".to_string(),
            },
        )
        .unwrap();
        self.apply(
            &context,
            Event::CandidatesRetrieved {
                request_id: "req".to_string(),
                candidates,
            },
        )
        .unwrap();
    }

    fn presented_names(&self) -> Vec<String> {
        self.log
            .iter()
            .filter_map(ConversationTurn::candidate)
            .map(|c| c.name.clone())
            .collect()
    }

    fn count_text(&self, text: &str) -> usize {
        self.log.iter().filter(|t| t.text() == Some(text)).count()
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_confidence() -> impl Strategy<Value = ConfidenceLevel> {
    prop_oneof![
        Just(ConfidenceLevel::High),
        Just(ConfidenceLevel::Medium),
        Just(ConfidenceLevel::Low),
    ]
}

/// Ranked list with distinct names and non-increasing scores
fn arb_ranked_candidates(max: usize) -> impl Strategy<Value = Vec<Candidate>> {
    prop::collection::vec((arb_confidence(), 0.0f64..=1.0), 1..=max).prop_map(|entries| {
        let mut scores: Vec<f64> = entries.iter().map(|(_, s)| *s).collect();
        scores.sort_by(|a, b| b.total_cmp(a));
        entries
            .into_iter()
            .zip(scores)
            .enumerate()
            .map(|(i, ((level, _), score))| {
                Candidate::new(format!("Condition {i}"), "Maize", level, score)
            })
            .collect()
    })
}

fn arb_blank() -> impl Strategy<Value = String> {
    "[ \t\n]{0,8}"
}

fn arb_query() -> impl Strategy<Value = String> {
    "[a-z]{1,12}( [a-z]{1,12}){0,4}"
}

#[derive(Debug, Clone)]
enum Action {
    Query(String),
    Answer(Vec<Candidate>),
    Fail,
    Confirm(bool),
    Cancel,
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        arb_query().prop_map(Action::Query),
        arb_blank().prop_map(Action::Query),
        prop::collection::vec(arb_confidence(), 0..4).prop_map(|levels| {
            Action::Answer(
                levels
                    .into_iter()
                    .enumerate()
                    .map(|(i, level)| Candidate::new(format!("C{i}"), "Beans", level, 0.5))
                    .collect(),
            )
        }),
        Just(Action::Fail),
        any::<bool>().prop_map(Action::Confirm),
        Just(Action::Cancel),
    ]
}

/// Turn an action into an event addressed at the current request, if any
fn action_event(state: &SessionState, action: Action, seq: usize) -> Event {
    let current = match state {
        SessionState::Retrieving { request_id, .. } => request_id.clone(),
        _ => "none".to_string(),
    };
    match action {
        Action::Query(text) => Event::QuerySubmitted {
            text,
            request_id: format!("req-{seq}"),
        },
        Action::Answer(candidates) => Event::CandidatesRetrieved {
            request_id: current,
            candidates,
        },
        Action::Fail => Event::RetrievalFailed {
            request_id: current,
            error: RetrievalError::network("timed out"),
        },
        Action::Confirm(accepted) => Event::Confirmation { accepted },
        Action::Cancel => Event::UserCancel,
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_blank_query_appends_nothing_and_retrieves_nothing(blank in arb_blank()) {
        let mut sim = Sim::default();
        sim.apply(&test_context(), Event::QuerySubmitted {
            text: blank,
            request_id: "r".to_string(),
        }).unwrap();

        prop_assert!(sim.log.is_empty());
        prop_assert!(sim.retrievals.is_empty());
        prop_assert_eq!(&sim.state, &SessionState::Idle);
    }

    #[test]
    fn prop_user_text_precedes_every_outcome(query in arb_query()) {
        let mut sim = Sim::default();
        sim.apply(&test_context(), Event::QuerySubmitted {
            text: query.clone(),
            request_id: "r".to_string(),
        }).unwrap();

        prop_assert_eq!(&sim.log, &vec![ConversationTurn::user(query.clone())]);
        prop_assert_eq!(&sim.retrievals, &vec![("r".to_string(), query)]);
    }

    #[test]
    fn prop_rejecting_everything_presents_all_in_order_then_exhausts(
        candidates in arb_ranked_candidates(6),
    ) {
        let expected: Vec<String> = candidates.iter().map(|c| c.name.clone()).collect();
        let n = candidates.len();

        let mut sim = Sim::default();
        sim.query_answered("spots", candidates);
        for _ in 0..n {
            prop_assert_eq!(sim.state.phase(), SessionPhase::AwaitingConfirmation);
            sim.apply(&test_context(), Event::Confirmation { accepted: false }).unwrap();
        }

        prop_assert_eq!(sim.presented_names(), expected);
        prop_assert_eq!(&sim.state, &SessionState::Idle);
        prop_assert_eq!(sim.log.last(), Some(&ConversationTurn::system(EXHAUSTED_TEXT)));
        prop_assert_eq!(sim.count_text(NEXT_CANDIDATE_TEXT), n - 1);
        prop_assert!(sim.feedback.is_empty());
    }

    #[test]
    fn prop_accepting_at_index_stops_presenting(
        (candidates, accept_at) in arb_ranked_candidates(6)
            .prop_flat_map(|c| { let n = c.len(); (Just(c), 0..n) }),
    ) {
        let accepted_name = candidates[accept_at].name.clone();

        let mut sim = Sim::default();
        sim.query_answered("spots", candidates);
        for _ in 0..accept_at {
            sim.apply(&test_context(), Event::Confirmation { accepted: false }).unwrap();
        }
        sim.apply(&test_context(), Event::Confirmation { accepted: true }).unwrap();

        prop_assert_eq!(&sim.state, &SessionState::Idle);
        prop_assert_eq!(sim.presented_names().len(), accept_at + 1);
        prop_assert_eq!(sim.count_text(CLOSING_TEXT), 1);
        prop_assert_eq!(sim.log.last(), Some(&ConversationTurn::system(CLOSING_TEXT)));
        prop_assert_eq!(&sim.feedback, &vec![(accepted_name, true)]);

        // Further confirmations change nothing
        let before = sim.log.len();
        sim.apply(&test_context(), Event::Confirmation { accepted: true }).unwrap();
        prop_assert_eq!(sim.log.len(), before);
    }

    #[test]
    fn prop_random_sessions_keep_invariants(
        actions in prop::collection::vec(arb_action(), 0..40),
    ) {
        let context = test_context();
        let mut sim = Sim::default();

        for (seq, action) in actions.into_iter().enumerate() {
            let log_before = sim.log.len();
            let feedback_before = sim.feedback.len();
            let was_awaiting = matches!(sim.state, SessionState::AwaitingConfirmation { .. });
            let is_accept = matches!(action, Action::Confirm(true));

            let event = action_event(&sim.state, action, seq);
            match sim.apply(&context, event) {
                Ok(()) => {}
                Err(TransitionError::SessionBusy) => {
                    prop_assert!(sim.state.is_loading());
                }
            }

            // Log only grows
            prop_assert!(sim.log.len() >= log_before);

            // Feedback only on accepting a presented candidate, always positive
            if sim.feedback.len() > feedback_before {
                prop_assert!(was_awaiting && is_accept);
                prop_assert!(sim.feedback.iter().all(|(_, ok)| *ok));
            }

            // The presented candidate is the most recent candidate turn
            if let SessionState::AwaitingConfirmation { queue } = &sim.state {
                let last_presented = sim.log.iter().rev().find_map(ConversationTurn::candidate);
                prop_assert_eq!(last_presented, Some(queue.front()));
            }
        }
    }

    #[test]
    fn prop_confirm_outside_awaiting_is_noop(
        accepted in any::<bool>(),
        retrieving in any::<bool>(),
    ) {
        let state = if retrieving {
            SessionState::Retrieving { request_id: "r".to_string(), query: "q".to_string() }
        } else {
            SessionState::Idle
        };
        let result = transition(&state, &test_context(), Event::Confirmation { accepted }).unwrap();
        prop_assert!(result.is_noop(&state));
    }
}
