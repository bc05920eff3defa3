//! Time-boxed weather cache
//!
//! Owned by the caller and passed in explicitly; there is no process-wide
//! cache. The clock is a parameter so expiry is deterministic.

use super::{Coordinates, WeatherError, WeatherReport, WeatherSource};
use chrono::{DateTime, Utc};
use std::time::Duration;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    fetched_at: DateTime<Utc>,
    coords: Coordinates,
    report: WeatherReport,
}

/// Single-entry cache keyed by location
#[derive(Debug, Clone)]
pub struct WeatherCache {
    ttl: Duration,
    entry: Option<CacheEntry>,
}

impl WeatherCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    /// The cached report for `coords`, if younger than the TTL at `now`
    pub fn fresh(&self, coords: Coordinates, now: DateTime<Utc>) -> Option<&WeatherReport> {
        let entry = self.entry.as_ref().filter(|e| e.coords == coords)?;
        // Negative age (clock moved backwards) counts as stale
        let age = (now - entry.fetched_at).to_std().ok()?;
        (age < self.ttl).then_some(&entry.report)
    }

    pub fn store(&mut self, coords: Coordinates, now: DateTime<Utc>, report: WeatherReport) {
        self.entry = Some(CacheEntry {
            fetched_at: now,
            coords,
            report,
        });
    }
}

impl Default for WeatherCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Return the cached report or fetch, store and return a new one.
///
/// A failed fetch leaves the cache as it was.
pub async fn cached_weather<S: WeatherSource + ?Sized>(
    source: &S,
    cache: &mut WeatherCache,
    coords: Coordinates,
    now: DateTime<Utc>,
) -> Result<WeatherReport, WeatherError> {
    if let Some(report) = cache.fresh(coords, now) {
        tracing::debug!(lat = coords.lat, lon = coords.lon, "Weather cache hit");
        return Ok(report.clone());
    }

    let report = source.fetch(coords).await?;
    tracing::info!(
        lat = coords.lat,
        lon = coords.lon,
        location = %report.current.location,
        "Weather fetched"
    );
    cache.store(coords, now, report.clone());
    Ok(report)
}
