//! Diagnosis feedback reporting
//!
//! At-most-once, fire-and-forget. A lost report costs one data point for the
//! ranking service; it never reaches the user or the session state.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;

/// Sink for the user's verdict on a presented diagnosis
#[async_trait]
pub trait FeedbackReporter: Send + Sync {
    /// Report a verdict. Implementations must swallow every failure.
    async fn report(&self, candidate_name: &str, is_correct: bool);
}

#[async_trait]
impl<T: FeedbackReporter + ?Sized> FeedbackReporter for Arc<T> {
    async fn report(&self, candidate_name: &str, is_correct: bool) {
        (**self).report(candidate_name, is_correct).await;
    }
}

#[derive(Debug, Serialize)]
struct FeedbackBody<'a> {
    diagnosis: &'a str,
    is_correct: bool,
}

/// Reports feedback with `POST {base}/feedback`
pub struct HttpFeedbackReporter {
    client: Client,
    feedback_url: String,
}

impl HttpFeedbackReporter {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            feedback_url: format!("{}/feedback", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl FeedbackReporter for HttpFeedbackReporter {
    async fn report(&self, candidate_name: &str, is_correct: bool) {
        let body = FeedbackBody {
            diagnosis: candidate_name,
            is_correct,
        };

        match self.client.post(&self.feedback_url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(diagnosis = %candidate_name, is_correct, "Feedback saved");
            }
            Ok(response) => {
                tracing::warn!(
                    diagnosis = %candidate_name,
                    status = %response.status(),
                    "Feedback not saved"
                );
            }
            Err(e) => {
                tracing::warn!(diagnosis = %candidate_name, error = %e, "Feedback not saved");
            }
        }
    }
}
