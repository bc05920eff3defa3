//! Server configuration from the environment

use crate::state_machine::OverlapPolicy;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVICE_URL: &str = "https://agriseed.onrender.com";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WEATHER_TTL_SECS: u64 = 60 * 60;
const DEFAULT_SESSION_IDLE_SECS: u64 = 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoctorConfig {
    /// Base URL of the ranking, feedback and weather service
    pub service_url: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub overlap_policy: OverlapPolicy,
    pub weather_ttl: Duration,
    /// Sessions untouched this long are dropped; zero keeps them forever
    pub session_idle_ttl: Duration,
}

impl Default for DoctorConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            port: DEFAULT_PORT,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            overlap_policy: OverlapPolicy::default(),
            weather_ttl: Duration::from_secs(DEFAULT_WEATHER_TTL_SECS),
            session_idle_ttl: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
        }
    }
}

impl DoctorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup; unset or empty means default
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let service_url = get("PEST_DOCTOR_SERVICE_URL").unwrap_or(defaults.service_url);

        let port = match get("PEST_DOCTOR_PORT") {
            Some(v) => parse_number("PEST_DOCTOR_PORT", &v)?,
            None => defaults.port,
        };

        let request_timeout = match get("PEST_DOCTOR_REQUEST_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_positive("PEST_DOCTOR_REQUEST_TIMEOUT_SECS", &v)?),
            None => defaults.request_timeout,
        };

        let overlap_policy = match get("PEST_DOCTOR_OVERLAP_POLICY") {
            Some(v) => parse_policy(&v)?,
            None => defaults.overlap_policy,
        };

        let weather_ttl = match get("PEST_DOCTOR_WEATHER_TTL_SECS") {
            Some(v) => Duration::from_secs(parse_number("PEST_DOCTOR_WEATHER_TTL_SECS", &v)?),
            None => defaults.weather_ttl,
        };

        let session_idle_ttl = match get("PEST_DOCTOR_SESSION_IDLE_SECS") {
            Some(v) => Duration::from_secs(parse_number("PEST_DOCTOR_SESSION_IDLE_SECS", &v)?),
            None => defaults.session_idle_ttl,
        };

        Ok(Self {
            service_url,
            port,
            request_timeout,
            overlap_policy,
            weather_ttl,
            session_idle_ttl,
        })
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        expected: "a non-negative integer",
        value: value.to_string(),
    })
}

fn parse_positive(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    match parse_number::<u64>(var, value) {
        Ok(0) | Err(_) => Err(ConfigError::Invalid {
            var,
            expected: "a positive integer",
            value: value.to_string(),
        }),
        Ok(n) => Ok(n),
    }
}

fn parse_policy(value: &str) -> Result<OverlapPolicy, ConfigError> {
    match value.trim() {
        "reject" => Ok(OverlapPolicy::Reject),
        "cancel_and_replace" => Ok(OverlapPolicy::CancelAndReplace),
        _ => Err(ConfigError::Invalid {
            var: "PEST_DOCTOR_OVERLAP_POLICY",
            expected: "`reject` or `cancel_and_replace`",
            value: value.to_string(),
        }),
    }
}
