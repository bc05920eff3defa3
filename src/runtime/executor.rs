//! Session runtime executor

use super::{SessionCommand, SessionEvent, SharedLog, Verdict};
use crate::diagnosis::DiagnosisService;
use crate::feedback::FeedbackReporter;
use crate::state_machine::{transition, Effect, Event, SessionContext, SessionState};
use std::sync::{Arc, PoisonError};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Generic session runtime that can work with any retrieval and feedback implementations
pub struct SessionRuntime<D, F>
where
    D: DiagnosisService + 'static,
    F: FeedbackReporter + 'static,
{
    context: SessionContext,
    state: SessionState,
    log: SharedLog,
    diagnosis: Arc<D>,
    feedback: Arc<F>,
    event_rx: mpsc::Receiver<SessionCommand>,
    event_tx: mpsc::Sender<SessionCommand>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    state_tx: watch::Sender<SessionState>,
    /// Stops the run loop
    shutdown: CancellationToken,
    /// Token to cancel the running retrieval
    retrieval_cancel_token: Option<CancellationToken>,
}

impl<D, F> SessionRuntime<D, F>
where
    D: DiagnosisService + 'static,
    F: FeedbackReporter + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: SessionContext,
        log: SharedLog,
        diagnosis: D,
        feedback: F,
        event_rx: mpsc::Receiver<SessionCommand>,
        event_tx: mpsc::Sender<SessionCommand>,
        broadcast_tx: broadcast::Sender<SessionEvent>,
        state_tx: watch::Sender<SessionState>,
    ) -> Self {
        let state = state_tx.borrow().clone();
        Self {
            context,
            state,
            log,
            diagnosis: Arc::new(diagnosis),
            feedback: Arc::new(feedback),
            event_rx,
            event_tx,
            broadcast_tx,
            state_tx,
            shutdown: CancellationToken::new(),
            retrieval_cancel_token: None,
        }
    }

    /// Stop the runtime when `token` is cancelled
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.context.session_id, "Starting session runtime");

        // Process events in a loop - one at a time, each to completion
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                Some(command) = self.event_rx.recv() => {
                    let verdict = self.process_event(command.event);
                    if let Err(e) = &verdict {
                        tracing::warn!(session_id = %self.context.session_id, error = %e, "Event rejected");
                    }
                    if let Some(reply) = command.reply {
                        let _ = reply.send(verdict);
                    }
                }
                else => break,
            }
        }

        if let Some(token) = self.retrieval_cancel_token.take() {
            token.cancel();
        }
        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) -> Verdict {
        // Pure state transition
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                // Transition errors are user-facing (e.g., "still looking")
                let _ = self.broadcast_tx.send(SessionEvent::Error {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        if result.is_noop(&self.state) {
            tracing::debug!(session_id = %self.context.session_id, "Event ignored in current state");
            return Ok(());
        }

        let changed = result.new_state != self.state;
        self.state = result.new_state;

        // Effects first, so the log is complete by the time the state is observed
        for effect in result.effects {
            self.execute_effect(effect);
        }

        if changed {
            if let SessionState::AwaitingConfirmation { queue } = &self.state {
                tracing::debug!(
                    session_id = %self.context.session_id,
                    remaining = queue.len(),
                    candidate = %queue.front().name,
                    "Presenting candidate"
                );
            }
            self.state_tx.send_replace(self.state.clone());
            let _ = self.broadcast_tx.send(SessionEvent::StateChange {
                state: self.state.clone(),
            });
        }

        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendTurn(turn) => {
                let sequence = self
                    .log
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .append(turn.clone());
                let _ = self.broadcast_tx.send(SessionEvent::Turn { sequence, turn });
            }

            Effect::RetrieveCandidates { request_id, query } => {
                let cancel_token = CancellationToken::new();
                self.retrieval_cancel_token = Some(cancel_token.clone());

                let diagnosis = self.diagnosis.clone();
                let event_tx = self.event_tx.clone();
                let session_id = self.context.session_id.clone();

                tokio::spawn(async move {
                    tracing::info!(session_id = %session_id, request_id = %request_id, "Retrieving candidates");

                    // Race retrieval against cancellation
                    tokio::select! {
                        biased;

                        () = cancel_token.cancelled() => {
                            tracing::info!(request_id = %request_id, "Retrieval cancelled");
                        }

                        result = diagnosis.retrieve(&query) => {
                            let event = match result {
                                Ok(candidates) => Event::CandidatesRetrieved {
                                    request_id,
                                    candidates,
                                },
                                Err(error) => Event::RetrievalFailed { request_id, error },
                            };
                            let _ = event_tx.send(SessionCommand::detached(event)).await;
                        }
                    }
                });
            }

            Effect::AbortRetrieval => {
                tracing::info!(session_id = %self.context.session_id, "Aborting retrieval");
                if let Some(token) = self.retrieval_cancel_token.take() {
                    token.cancel();
                }
            }

            Effect::ReportFeedback {
                candidate_name,
                is_correct,
            } => {
                // Detached: the session never waits for or learns the outcome
                let feedback = self.feedback.clone();
                tokio::spawn(async move {
                    feedback.report(&candidate_name, is_correct).await;
                });
            }
        }
    }
}
