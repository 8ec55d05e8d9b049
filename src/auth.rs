//! Google Cloud access tokens for the store and the intent gateway.
//!
//! Service-account keys are exchanged for short-lived bearer tokens with the
//! OAuth2 JWT bearer grant. Tokens are cached until shortly before expiry.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::CredentialSource;
use crate::error::AuthError;

/// Scope requested for every minted token.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens are refreshed this long before they actually expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Source of bearer tokens for Google APIs.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<SecretString, AuthError>;
}

/// Build a token source from configuration.
pub fn token_source(
    credentials: &CredentialSource,
    client: reqwest::Client,
) -> Result<Arc<dyn TokenSource>, AuthError> {
    match credentials {
        CredentialSource::ServiceAccountFile(path) => {
            Ok(Arc::new(ServiceAccountTokenSource::from_file(path, client)?))
        }
        CredentialSource::StaticToken(token) => Ok(Arc::new(StaticTokenSource::new(token.clone()))),
    }
}

/// A fixed token, never refreshed.
pub struct StaticTokenSource {
    token: SecretString,
}

impl StaticTokenSource {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<SecretString, AuthError> {
        Ok(self.token.clone())
    }
}

/// The fields of a service-account key file that token minting needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

struct CachedToken {
    token: SecretString,
    expires_at: DateTime<Utc>,
}

/// Mints tokens from a service-account key.
pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    /// Load a service-account JSON key file.
    pub fn from_file(path: &Path, client: reqwest::Client) -> Result<Self, AuthError> {
        let raw = std::fs::read_to_string(path)?;
        let key: ServiceAccountKey = serde_json::from_str(&raw)
            .map_err(|e| AuthError::InvalidCredentials(format!("{}: {e}", path.display())))?;
        Self::new(key, client)
    }

    pub fn new(key: ServiceAccountKey, client: reqwest::Client) -> Result<Self, AuthError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| AuthError::InvalidCredentials(format!("private_key: {e}")))?;
        Ok(Self {
            key,
            encoding_key,
            client,
            cached: Mutex::new(None),
        })
    }

    fn token_uri(&self) -> &str {
        self.key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: self.token_uri(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    async fn mint(&self) -> Result<CachedToken, AuthError> {
        let now = Utc::now();
        let assertion = self.sign_assertion(now)?;

        let resp = self
            .client
            .post(self.token_uri())
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::TokenRequest(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::TokenRequest(format!("{status}: {body}")));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::TokenRequest(format!("invalid token response: {e}")))?;

        info!(account = %self.key.client_email, expires_in = token.expires_in, "Minted Google access token");

        Ok(CachedToken {
            token: SecretString::from(token.access_token),
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<SecretString, AuthError> {
        let mut cached = self.cached.lock().await;

        if let Some(ref current) = *cached {
            if current.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > Utc::now() {
                debug!("Reusing cached Google access token");
                return Ok(current.token.clone());
            }
        }

        let fresh = self.mint().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}

/// Format a bearer `Authorization` header value.
pub(crate) fn bearer(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn static_source_returns_its_token() {
        let source = StaticTokenSource::new(SecretString::from("ya29.test"));
        let token = source.access_token().await.unwrap();
        assert_eq!(token.expose_secret(), "ya29.test");
        assert_eq!(bearer(&token), "Bearer ya29.test");
    }

    #[test]
    fn key_file_with_bad_pem_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"client_email": "bot@example.iam.gserviceaccount.com", "private_key": "not a key"}}"#
        )
        .unwrap();

        let result = ServiceAccountTokenSource::from_file(file.path(), reqwest::Client::new());
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[test]
    fn key_file_that_is_not_json_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "client_email=bot").unwrap();

        let result = ServiceAccountTokenSource::from_file(file.path(), reqwest::Client::new());
        match result {
            Err(AuthError::InvalidCredentials(msg)) => {
                assert!(msg.contains(&file.path().display().to_string()))
            }
            _ => panic!("expected InvalidCredentials"),
        }
    }

    #[test]
    fn missing_key_file_is_io_error() {
        let result = ServiceAccountTokenSource::from_file(
            Path::new("/nonexistent/cardio-assist/key.json"),
            reqwest::Client::new(),
        );
        assert!(matches!(result, Err(AuthError::Io(_))));
    }

    #[test]
    fn static_credentials_build_a_source() {
        let creds = CredentialSource::StaticToken(SecretString::from("abc"));
        assert!(token_source(&creds, reqwest::Client::new()).is_ok());
    }
}
