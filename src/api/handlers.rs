//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    CancelResponse, ConfirmRequest, CreateSessionResponse, ErrorResponse, QueryRequest,
    QueuedResponse, SessionResponse, SuccessResponse, TurnEntry, TurnsQuery, TurnsResponse,
    WeatherQuery,
};
use super::AppState;
use crate::runtime::{SessionError, SessionHandle};
use crate::state_machine::Event;
use crate::weather::{cached_weather, Coordinates, WeatherReport, DEFAULT_LOCATION};
use crate::yield_forecast::{YieldError, YieldForecast, YieldRequest};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/turns", get(get_turns))
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // User actions
        .route("/api/sessions/:id/query", post(submit_query))
        .route("/api/sessions/:id/confirm", post(confirm_candidate))
        .route("/api/sessions/:id/cancel", post(cancel_retrieval))
        // Farm services
        .route("/api/weather", get(get_weather))
        .route("/api/yield", post(forecast_yield))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

fn snapshot(handle: &SessionHandle) -> SessionResponse {
    SessionResponse {
        session_id: handle.session_id().to_string(),
        state: handle.state(),
        loading: handle.is_loading(),
        turns: TurnEntry::numbered(handle.turns()),
    }
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let handle = state.sessions.create().await;
    Json(CreateSessionResponse {
        session_id: handle.session_id().to_string(),
    })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let handle = state.sessions.get(&id).await?;
    Ok(Json(snapshot(&handle)))
}

async fn get_turns(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<TurnsQuery>,
) -> Result<Json<TurnsResponse>, AppError> {
    let handle = state.sessions.get(&id).await?;
    let turns = handle
        .turns_after(query.after)
        .into_iter()
        .map(TurnEntry::from)
        .collect();
    Ok(Json(TurnsResponse { turns }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.sessions.remove(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Streaming
// ============================================================

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let handle = state.sessions.get(&id).await?;

    // Subscribe before the snapshot so nothing falls in between
    let broadcast_rx = handle.subscribe();
    let init = snapshot(&handle);

    Ok(sse_stream(init, broadcast_rx))
}

// ============================================================
// User Actions
// ============================================================

async fn submit_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    state.sessions.send_event(&id, Event::query(req.text)).await?;
    Ok(Json(QueuedResponse { queued: true }))
}

async fn confirm_candidate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    state
        .sessions
        .send_event(
            &id,
            Event::Confirmation {
                accepted: req.accepted,
            },
        )
        .await?;
    Ok(Json(QueuedResponse { queued: true }))
}

async fn cancel_retrieval(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, AppError> {
    state.sessions.send_event(&id, Event::UserCancel).await?;
    Ok(Json(CancelResponse { ok: true }))
}

// ============================================================
// Weather
// ============================================================

async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<WeatherReport>, AppError> {
    let coords = match (query.lat, query.lon) {
        (Some(lat), Some(lon)) => Coordinates { lat, lon },
        (None, None) => DEFAULT_LOCATION,
        _ => {
            return Err(AppError::BadRequest(
                "lat and lon must be given together".to_string(),
            ))
        }
    };

    let mut cache = state.weather_cache.lock().await;
    let report = cached_weather(state.weather.as_ref(), &mut cache, coords, chrono::Utc::now())
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Weather lookup failed");
            AppError::BadGateway(e.to_string())
        })?;

    Ok(Json(report))
}

// ============================================================
// Yield
// ============================================================

async fn forecast_yield(
    State(state): State<AppState>,
    Json(req): Json<YieldRequest>,
) -> Result<Json<YieldForecast>, AppError> {
    let forecast = state.yields.forecast(&req).await.map_err(|e| {
        tracing::warn!(error = %e, crop = %req.crop, "Yield forecast failed");
        match e {
            // The service refused the plan itself
            YieldError::Service { status, detail } if (400..500).contains(&status) => {
                AppError::BadRequest(detail)
            }
            other => AppError::BadGateway(other.to_string()),
        }
    })?;

    Ok(Json(forecast))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("pest-doctor ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Gone(String),
    BadGateway(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) => AppError::NotFound(e.to_string()),
            SessionError::Closed => AppError::Gone(e.to_string()),
            SessionError::Rejected(_) => AppError::Conflict(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Gone(msg) => (StatusCode::GONE, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
