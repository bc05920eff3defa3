//! HTTP adapter for the ranking service
//!
//! `GET {base}/diagnose?query=...` answers with `{ "results": [...] }` or
//! `{ "error": "..." }`. Everything coming back is parsed into typed
//! candidates here; nothing untyped crosses into the session.

use super::{Candidate, ConfidenceLevel, DiagnosisService, RetrievalError, DEFAULT_RECOMMENDATION};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

/// Ranking service reached over HTTP
pub struct HttpDiagnosisService {
    client: Client,
    diagnose_url: String,
}

impl HttpDiagnosisService {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            diagnose_url: format!("{}/diagnose", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl DiagnosisService for HttpDiagnosisService {
    async fn retrieve(&self, query: &str) -> Result<Vec<Candidate>, RetrievalError> {
        let response = self
            .client
            .get(&self.diagnose_url)
            .query(&[("query", query)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RetrievalError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    RetrievalError::network(format!("Connection failed: {e}"))
                } else {
                    RetrievalError::network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RetrievalError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(RetrievalError::service(
                status.as_u16(),
                error_detail(&body).unwrap_or_else(|| format!("Backend returned status {status}")),
            ));
        }

        parse_diagnose_body(status.as_u16(), &body)
    }
}

/// Parse and validate a `/diagnose` body.
///
/// A non-empty `error` field wins over `results` even when both are present.
pub(crate) fn parse_diagnose_body(status: u16, body: &str) -> Result<Vec<Candidate>, RetrievalError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| RetrievalError::malformed(format!("Response is not JSON: {e}")))?;

    if let Some(error) = value
        .get("error")
        .and_then(Value::as_str)
        .filter(|e| !e.is_empty())
    {
        return Err(RetrievalError::service(status, error));
    }

    let results = value
        .get("results")
        .cloned()
        .ok_or_else(|| RetrievalError::malformed("Response has neither `results` nor `error`"))?;

    let wire: Vec<WireCandidate> = serde_json::from_value(results)
        .map_err(|e| RetrievalError::malformed(format!("Invalid candidate list: {e}")))?;

    let candidates = wire
        .into_iter()
        .enumerate()
        .map(|(rank, c)| c.into_candidate(rank))
        .collect::<Result<Vec<_>, _>>()?;

    if candidates
        .windows(2)
        .any(|pair| pair[1].similarity_score > pair[0].similarity_score)
    {
        tracing::warn!(
            count = candidates.len(),
            "Ranking service returned candidates out of score order; keeping service order"
        );
    }

    Ok(candidates)
}

/// `detail` (FastAPI) or `error` from a failure body, if there is one
pub(crate) fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    common_name: String,
    crop: String,
    confidence_level: String,
    similarity_score: f64,
    #[serde(default)]
    key_symptoms_sample: Option<Vec<String>>,
    #[serde(default)]
    management_options: Option<WireManagementOptions>,
}

#[derive(Debug, Deserialize)]
struct WireManagementOptions {
    #[serde(default)]
    cultural: Option<String>,
}

impl WireCandidate {
    fn into_candidate(self, rank: usize) -> Result<Candidate, RetrievalError> {
        if self.common_name.trim().is_empty() {
            return Err(RetrievalError::malformed(format!(
                "Candidate {rank} has an empty `common_name`"
            )));
        }

        let confidence_level = ConfidenceLevel::from_label(&self.confidence_level).ok_or_else(|| {
            RetrievalError::malformed(format!(
                "Candidate {rank} has unknown confidence level {:?}",
                self.confidence_level
            ))
        })?;

        if !(0.0..=1.0).contains(&self.similarity_score) {
            return Err(RetrievalError::malformed(format!(
                "Candidate {rank} has similarity score {} outside [0, 1]",
                self.similarity_score
            )));
        }

        let recommendation = self
            .management_options
            .and_then(|m| m.cultural)
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RECOMMENDATION.to_string());

        Ok(Candidate {
            name: self.common_name,
            crop: self.crop,
            confidence_level,
            similarity_score: self.similarity_score,
            symptoms: self.key_symptoms_sample.unwrap_or_default(),
            recommendation,
        })
    }
}
