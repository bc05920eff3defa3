//! Pest Doctor - guided pest and disease diagnosis
//!
//! Walks a farmer through a ranked list of candidate diagnoses, one at a
//! time, until one is confirmed or the list runs out.

mod api;
mod config;
mod conversation;
mod diagnosis;
mod feedback;
mod runtime;
mod state_machine;
mod weather;
mod yield_forecast;

use api::{create_router, AppState};
use config::DoctorConfig;
use diagnosis::{HttpDiagnosisService, LoggingService};
use feedback::HttpFeedbackReporter;
use runtime::{spawn_idle_sweep, SessionManager};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weather::WeatherClient;
use yield_forecast::YieldClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pest_doctor=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = DoctorConfig::from_env()?;
    tracing::info!(
        service_url = %config.service_url,
        timeout_secs = config.request_timeout.as_secs(),
        overlap_policy = ?config.overlap_policy,
        "Configuration loaded"
    );

    // One HTTP client shared by every outbound adapter
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    let diagnosis = Arc::new(LoggingService::new(Arc::new(HttpDiagnosisService::new(
        client.clone(),
        &config.service_url,
    ))));
    let feedback = Arc::new(HttpFeedbackReporter::new(client.clone(), &config.service_url));
    let weather = Arc::new(WeatherClient::new(client.clone(), &config.service_url));
    let yields = Arc::new(YieldClient::new(client, &config.service_url));

    // Create application state
    let sessions = SessionManager::new(diagnosis, feedback, config.overlap_policy);
    let state = AppState::new(sessions, weather, config.weather_ttl, yields);
    spawn_idle_sweep(state.sessions.clone(), config.session_idle_ttl);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Pest Doctor server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
