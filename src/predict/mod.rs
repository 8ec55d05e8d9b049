//! Prediction services for exercise recommendations and cardiovascular risk.
//!
//! Both models run as stateless HTTP functions taking a flat JSON payload.

pub mod client;

pub use client::CloudFunctionModels;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;

/// Encoded preferences sent to the recommendation model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationRequest {
    #[serde(rename = "Cardiovascular_Safe")]
    pub cardiovascular_safe: f64,
    #[serde(rename = "BodyPart_Category_Encoded")]
    pub body_part: f64,
    #[serde(rename = "Equipment_Encoded")]
    pub equipment: f64,
    #[serde(rename = "Level")]
    pub level: f64,
    /// Exercise type: 0 default, 1 cardio, 2 plyometrics, 3 strength, 4 stretching.
    #[serde(rename = "Type")]
    pub exercise_type: f64,
    pub top_n: u32,
}

/// One recommended exercise.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Exercise {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Desc", default)]
    pub description: String,
}

/// Recommendation model response. `exercises` is `None` when the field was missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecommendationResponse {
    #[serde(rename = "recomendaciones", default)]
    pub exercises: Option<Vec<Exercise>>,
}

/// Profile features sent to the risk model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskRequest {
    pub age: f64,
    pub ap_hi: f64,
    pub ap_lo: f64,
    pub height: f64,
    pub weight: f64,
    /// 1 = female, 2 = male, 0 = unknown.
    pub gender: u8,
    pub cholesterol: f64,
    pub gluc: f64,
    pub smoke: u8,
    pub alco: u8,
    pub active: u8,
}

/// Risk model response. `prediction` is `None` when the field was missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RiskResponse {
    #[serde(rename = "prediccion", default)]
    pub prediction: Option<f64>,
}

/// The two prediction models.
#[async_trait]
pub trait HealthModels: Send + Sync {
    async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, UpstreamError>;

    async fn assess_risk(&self, request: &RiskRequest) -> Result<RiskResponse, UpstreamError>;
}
