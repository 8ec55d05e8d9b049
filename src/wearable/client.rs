//! Huawei Health client for the OAuth token endpoint and the vital-signs endpoint.

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use super::vitals::VitalSigns;
use crate::config::WearableConfig;
use crate::error::UpstreamError;

const SERVICE: &str = "wearable";

/// Tokens issued by the vendor token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// The wearable vendor API.
#[async_trait]
pub trait WearableApi: Send + Sync {
    /// Fetch the latest vital signs with a bearer access token.
    async fn fetch_vitals(&self, access_token: &str) -> Result<VitalSigns, UpstreamError>;

    /// Exchange an authorization code for an access/refresh token pair.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, UpstreamError>;

    /// Exchange a refresh token for a new access token.
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, UpstreamError>;
}

/// Builds the URL the user opens to authorize the bridge.
#[derive(Debug, Clone)]
pub struct AuthorizationLink {
    pub auth_url: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
}

impl AuthorizationLink {
    pub fn from_config(config: &WearableConfig) -> Self {
        Self {
            auth_url: config.auth_url.clone(),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scope: config.scope.clone(),
        }
    }

    /// Authorization URL carrying an opaque `state` back to the callback.
    pub fn with_state(&self, state: &str) -> String {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", self.scope.as_str()),
            ("state", state),
        ];
        match Url::parse_with_params(&self.auth_url, &params) {
            Ok(url) => url.to_string(),
            Err(e) => {
                warn!(auth_url = %self.auth_url, error = %e, "Auth URL is not a valid URL; building it verbatim");
                let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
                format!("{}?{}", self.auth_url, query.join("&"))
            }
        }
    }
}

pub struct HuaweiHealthClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    token_url: String,
    data_url: String,
}

impl HuaweiHealthClient {
    pub fn new(config: &WearableConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            token_url: config.token_url.clone(),
            data_url: config.data_url.clone(),
        }
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenGrant, UpstreamError> {
        let resp = self
            .client
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| UpstreamError::request(SERVICE, e))?;

        if !resp.status().is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE.to_string(),
                status: resp.status().as_u16(),
            });
        }

        resp.json()
            .await
            .map_err(|e| UpstreamError::invalid(SERVICE, e))
    }
}

#[async_trait]
impl WearableApi for HuaweiHealthClient {
    async fn fetch_vitals(&self, access_token: &str) -> Result<VitalSigns, UpstreamError> {
        let resp = self
            .client
            .get(&self.data_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| UpstreamError::request(SERVICE, e))?;

        if !resp.status().is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let vitals: VitalSigns = resp
            .json()
            .await
            .map_err(|e| UpstreamError::invalid(SERVICE, e))?;
        debug!(?vitals, "Vital signs received");
        Ok(vitals)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, UpstreamError> {
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, UpstreamError> {
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("refresh_token", refresh_token),
        ])
        .await
    }
}
