//! Candidate diagnosis types

use serde::{Deserialize, Serialize};

/// Advice shown when the service has no cultural management text
pub const DEFAULT_RECOMMENDATION: &str = "Contact your local extension officer for guidance.";

/// Confidence band assigned by the ranking service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        }
    }

    /// Parse the service's label; labels are case-sensitive on the wire
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "High" => Some(ConfidenceLevel::High),
            "Medium" => Some(ConfidenceLevel::Medium),
            "Low" => Some(ConfidenceLevel::Low),
            _ => None,
        }
    }
}

/// One ranked diagnosis hypothesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub crop: String,
    pub confidence_level: ConfidenceLevel,
    /// In [0, 1]; non-increasing across a result set
    pub similarity_score: f64,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub recommendation: String,
}

impl Candidate {
    pub fn new(
        name: impl Into<String>,
        crop: impl Into<String>,
        confidence_level: ConfidenceLevel,
        similarity_score: f64,
    ) -> Self {
        Self {
            name: name.into(),
            crop: crop.into(),
            confidence_level,
            similarity_score,
            symptoms: Vec::new(),
            recommendation: DEFAULT_RECOMMENDATION.to_string(),
        }
    }

    #[allow(dead_code)] // Builder used by tests and fixtures
    pub fn with_symptoms<I, S>(mut self, symptoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symptoms = symptoms.into_iter().map(Into::into).collect();
        self
    }

    #[allow(dead_code)] // Builder used by tests and fixtures
    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = recommendation.into();
        self
    }
}
