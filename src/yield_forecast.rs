//! Yield forecast
//!
//! `POST {base}/predict-yield` turns a planting plan into expected yield,
//! harvest date, fertilizer schedule and a rough budget.

use crate::diagnosis::error_detail;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A planting plan to forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldRequest {
    pub crop: String,
    pub variety: String,
    pub soil_type: String,
    /// Sent as `YYYY-MM-DD`
    pub planting_date: NaiveDate,
    pub land_size_acres: f64,
    pub fertilizer_type: String,
    pub fertilizer_rate_kg_per_ha: f64,
    pub rainfall_mm: f64,
    pub avg_temperature_c: f64,
    /// 0 to 100
    pub management_score: u32,
    /// 0 to 100
    pub pest_pressure: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldForecast {
    pub prediction: YieldPrediction,
    pub planting_window: PlantingWindow,
    pub fertilizer_plan: FertilizerPlan,
    pub financial: FinancialEstimate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldPrediction {
    pub yield_per_ha: f64,
    pub total_yield_tonnes: f64,
    pub maturity_days: u32,
    pub harvest_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantingWindow {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilizerPlan {
    #[serde(rename = "type")]
    pub fertilizer_type: String,
    pub basal: String,
    #[serde(default)]
    pub topdress1: Option<String>,
    #[serde(default)]
    pub topdress2: Option<String>,
}

/// Amounts in Malawian kwacha
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialEstimate {
    pub estimated_revenue: f64,
    pub estimated_cost: f64,
    pub estimated_profit: f64,
    pub price_per_ton: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum YieldError {
    #[error("Yield service returned {status}: {detail}")]
    Service { status: u16, detail: String },
    #[error("Yield request failed: {0}")]
    Network(String),
    #[error("Malformed yield response: {0}")]
    Malformed(String),
}

/// Source of yield forecasts
#[async_trait]
pub trait YieldSource: Send + Sync {
    async fn forecast(&self, request: &YieldRequest) -> Result<YieldForecast, YieldError>;
}

/// Yield service reached over HTTP
pub struct YieldClient {
    client: Client,
    predict_url: String,
}

impl YieldClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            predict_url: format!("{}/predict-yield", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl YieldSource for YieldClient {
    async fn forecast(&self, request: &YieldRequest) -> Result<YieldForecast, YieldError> {
        let response = self
            .client
            .post(&self.predict_url)
            .json(request)
            .send()
            .await
            .map_err(|e| YieldError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| YieldError::Network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(YieldError::Service {
                status: status.as_u16(),
                detail: error_detail(&body).unwrap_or_else(|| status.to_string()),
            });
        }

        parse_forecast_body(&body)
    }
}

fn parse_forecast_body(body: &str) -> Result<YieldForecast, YieldError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| YieldError::Malformed(e.to_string()))?;

    if value.get("success").and_then(Value::as_bool) != Some(true) {
        return Err(YieldError::Malformed(
            "Response does not report success".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| YieldError::Malformed(e.to_string()))
}
