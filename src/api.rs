//! HTTP API for Pest Doctor
//!
//! Thin presentation boundary: each route forwards to a session, the
//! weather cache or the yield service and renders the result as JSON or SSE.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::SessionManager;
use crate::weather::{WeatherCache, WeatherSource};
use crate::yield_forecast::YieldSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub weather: Arc<dyn WeatherSource>,
    pub weather_cache: Arc<Mutex<WeatherCache>>,
    pub yields: Arc<dyn YieldSource>,
}

impl AppState {
    pub fn new(
        sessions: SessionManager,
        weather: Arc<dyn WeatherSource>,
        weather_ttl: Duration,
        yields: Arc<dyn YieldSource>,
    ) -> Self {
        Self {
            sessions: Arc::new(sessions),
            weather,
            weather_cache: Arc::new(Mutex::new(WeatherCache::new(weather_ttl))),
            yields,
        }
    }
}
