//! Diagnosis retrieval
//!
//! Client side of the similarity-search service that ranks candidate
//! diagnoses for a free-text symptom description.

mod error;
mod http;
mod types;

pub use error::{RetrievalError, RetrievalErrorKind};
pub(crate) use http::error_detail;
pub use http::HttpDiagnosisService;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Source of ranked candidate diagnoses
#[async_trait]
pub trait DiagnosisService: Send + Sync {
    /// Rank candidates for a symptom description.
    ///
    /// The returned order is the service's ranking and must be preserved.
    async fn retrieve(&self, query: &str) -> Result<Vec<Candidate>, RetrievalError>;
}

#[async_trait]
impl<T: DiagnosisService + ?Sized> DiagnosisService for Arc<T> {
    async fn retrieve(&self, query: &str) -> Result<Vec<Candidate>, RetrievalError> {
        (**self).retrieve(query).await
    }
}

/// Logging wrapper for diagnosis services
pub struct LoggingService {
    inner: Arc<dyn DiagnosisService>,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn DiagnosisService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl DiagnosisService for LoggingService {
    async fn retrieve(&self, query: &str) -> Result<Vec<Candidate>, RetrievalError> {
        let start = std::time::Instant::now();
        let result = self.inner.retrieve(query).await;
        let duration = start.elapsed();

        match &result {
            Ok(candidates) => {
                tracing::info!(
                    duration_ms = %duration.as_millis(),
                    candidates = candidates.len(),
                    top = candidates.first().map_or("", |c| c.name.as_str()),
                    "Diagnosis request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Diagnosis request failed"
                );
            }
        }

        result
    }
}
