//! Runtime for executing confirmation sessions
//!
//! Each session is a tokio task that owns its state and conversation log and
//! applies events one at a time. Callers talk to it through a
//! `SessionHandle`.

mod executor;


pub use executor::SessionRuntime;

use crate::conversation::{ConversationLog, ConversationTurn};
use crate::diagnosis::DiagnosisService;
use crate::feedback::FeedbackReporter;
use crate::state_machine::{Event, OverlapPolicy, SessionContext, SessionState, TransitionError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

/// Conversation log shared between the runtime (writer) and readers
pub type SharedLog = Arc<RwLock<ConversationLog>>;

/// Upper bound on the wait between idle sweeps
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Session has stopped")]
    Closed,
    #[error(transparent)]
    Rejected(#[from] TransitionError),
}

/// Outcome of applying one event
pub type Verdict = Result<(), TransitionError>;

/// Message delivered to the session task
#[derive(Debug)]
pub struct SessionCommand {
    event: Event,
    /// Receives the transition outcome once the event has been applied
    reply: Option<oneshot::Sender<Verdict>>,
}

impl SessionCommand {
    /// An event whose outcome nobody waits for
    pub fn detached(event: Event) -> Self {
        Self { event, reply: None }
    }
}

/// Events sent to subscribers
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Turn {
        sequence: usize,
        turn: ConversationTurn,
    },
    StateChange {
        state: SessionState,
    },
    Error {
        message: String,
    },
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    session_id: String,
    event_tx: mpsc::Sender<SessionCommand>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    state_rx: watch::Receiver<SessionState>,
    log: SharedLog,
    shutdown: CancellationToken,
    last_active: Arc<Mutex<Instant>>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Apply an event and wait for the session to accept or refuse it
    pub async fn send(&self, event: Event) -> Result<(), SessionError> {
        let (reply, verdict) = oneshot::channel();
        self.event_tx
            .send(SessionCommand {
                event,
                reply: Some(reply),
            })
            .await
            .map_err(|_| SessionError::Closed)?;

        // A dropped reply means the task stopped before reaching the event
        verdict.await.map_err(|_| SessionError::Closed)??;
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state_rx.borrow().is_loading()
    }

    /// Snapshot of every turn, oldest first
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.read_log(|log| log.iter().cloned().collect())
    }

    /// Turns newer than `sequence`, paired with their sequence numbers
    pub fn turns_after(&self, sequence: usize) -> Vec<(usize, ConversationTurn)> {
        self.read_log(|log| {
            log.after(sequence)
                .iter()
                .cloned()
                .enumerate()
                .map(|(offset, turn)| (sequence + offset + 1, turn))
                .collect()
        })
    }

    /// Stop the session task
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    fn touch(&self) {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Nobody has looked the session up for `idle_ttl` and nobody is streaming it
    fn is_idle(&self, idle_ttl: Duration, now: Instant) -> bool {
        let last_active = *self.last_active.lock().unwrap_or_else(PoisonError::into_inner);
        self.broadcast_tx.receiver_count() == 0
            && now.saturating_duration_since(last_active) >= idle_ttl
    }

    fn read_log<T>(&self, f: impl FnOnce(&ConversationLog) -> T) -> T {
        let log = self.log.read().unwrap_or_else(PoisonError::into_inner);
        f(&log)
    }
}

/// Start a session task and return its handle
pub fn spawn_session<D, F>(
    context: SessionContext,
    log: ConversationLog,
    diagnosis: D,
    feedback: F,
) -> SessionHandle
where
    D: DiagnosisService + 'static,
    F: FeedbackReporter + 'static,
{
    let session_id = context.session_id.clone();
    let log: SharedLog = Arc::new(RwLock::new(log));
    let (event_tx, event_rx) = mpsc::channel(32);
    let (broadcast_tx, _) = broadcast::channel(128);
    let (state_tx, state_rx) = watch::channel(SessionState::Idle);
    let shutdown = CancellationToken::new();

    let runtime = SessionRuntime::new(
        context,
        log.clone(),
        diagnosis,
        feedback,
        event_rx,
        event_tx.clone(),
        broadcast_tx.clone(),
        state_tx,
    )
    .with_shutdown(shutdown.clone());

    let id = session_id.clone();
    tokio::spawn(async move {
        runtime.run().await;
        tracing::info!(session_id = %id, "Session runtime finished");
    });

    SessionHandle {
        session_id,
        event_tx,
        broadcast_tx,
        state_rx,
        log,
        shutdown,
        last_active: Arc::new(Mutex::new(Instant::now())),
    }
}

/// Manager for all sessions
pub struct SessionManager {
    diagnosis: Arc<dyn DiagnosisService>,
    feedback: Arc<dyn FeedbackReporter>,
    overlap_policy: OverlapPolicy,
    sessions: tokio::sync::RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new(
        diagnosis: Arc<dyn DiagnosisService>,
        feedback: Arc<dyn FeedbackReporter>,
        overlap_policy: OverlapPolicy,
    ) -> Self {
        Self {
            diagnosis,
            feedback,
            overlap_policy,
            sessions: tokio::sync::RwLock::new(HashMap::new()),
        }
    }

    /// Start a new session with a greeting in its log
    pub async fn create(&self) -> SessionHandle {
        let session_id = uuid::Uuid::new_v4().to_string();
        let context =
            SessionContext::new(&session_id).with_overlap_policy(self.overlap_policy);

        let handle = spawn_session(
            context,
            ConversationLog::with_greeting(),
            self.diagnosis.clone(),
            self.feedback.clone(),
        );

        tracing::info!(session_id = %session_id, policy = ?self.overlap_policy, "Session created");
        self.sessions
            .write()
            .await
            .insert(session_id, handle.clone());
        handle
    }

    /// Look a session up; counts as activity for the idle sweep
    pub async fn get(&self, session_id: &str) -> Result<SessionHandle, SessionError> {
        let handle = self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        handle.touch();
        Ok(handle)
    }

    /// Send an event to a session and wait for it to be applied
    pub async fn send_event(&self, session_id: &str, event: Event) -> Result<(), SessionError> {
        self.get(session_id).await?.send(event).await
    }

    /// Stop a session and forget it
    pub async fn remove(&self, session_id: &str) -> Result<(), SessionError> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        handle.close();
        tracing::info!(session_id = %session_id, "Session closed");
        Ok(())
    }

    /// Stop and forget every idle session, returning how many went
    pub async fn remove_idle(&self, idle_ttl: Duration, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, handle)| handle.is_idle(idle_ttl, now))
            .map(|(id, _)| id.clone())
            .collect();

        for session_id in &expired {
            if let Some(handle) = sessions.remove(session_id) {
                handle.close();
            }
        }
        expired.len()
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Periodically drop sessions idle for `idle_ttl`. A zero TTL disables the sweep.
pub fn spawn_idle_sweep(manager: Arc<SessionManager>, idle_ttl: Duration) {
    if idle_ttl.is_zero() {
        tracing::info!("Idle session sweep disabled");
        return;
    }

    tokio::spawn(async move {
        let mut sweep_timer = tokio::time::interval(idle_ttl.min(MAX_SWEEP_INTERVAL));
        loop {
            sweep_timer.tick().await;
            let expired = manager.remove_idle(idle_ttl, Instant::now()).await;
            if expired > 0 {
                let remaining = manager.active_count().await;
                tracing::info!(
                    expired,
                    remaining,
                    "Removed idle sessions"
                );
            }
        }
    });
}
