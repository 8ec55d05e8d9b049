//! HTTP client for the prediction cloud functions.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{HealthModels, RecommendationRequest, RecommendationResponse, RiskRequest, RiskResponse};
use crate::config::PredictionConfig;
use crate::error::UpstreamError;

pub struct CloudFunctionModels {
    client: reqwest::Client,
    recommendation_url: String,
    risk_url: String,
}

impl CloudFunctionModels {
    pub fn new(config: &PredictionConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            recommendation_url: config.recommendation_url.clone(),
            risk_url: config.risk_url.clone(),
        }
    }

    async fn post<Req, Resp>(&self, service: &str, url: &str, body: &Req) -> Result<Resp, UpstreamError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| UpstreamError::request(service, e))?;

        if !resp.status().is_success() {
            return Err(UpstreamError::Status {
                service: service.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let raw = resp
            .text()
            .await
            .map_err(|e| UpstreamError::request(service, e))?;
        debug!(service, response = %raw, "Prediction service responded");
        serde_json::from_str(&raw).map_err(|e| UpstreamError::invalid(service, e))
    }
}

#[async_trait]
impl HealthModels for CloudFunctionModels {
    async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, UpstreamError> {
        self.post("recommendation", &self.recommendation_url, request)
            .await
    }

    async fn assess_risk(&self, request: &RiskRequest) -> Result<RiskResponse, UpstreamError> {
        self.post("risk", &self.risk_url, request).await
    }
}
