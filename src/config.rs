//! Configuration types, built from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default GCP project hosting the agent, the store, and the prediction functions.
pub const DEFAULT_PROJECT_ID: &str = "asistente-cardiovascular";

/// Top-level bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Port for the webhook HTTP server.
    pub port: u16,
    pub firestore: FirestoreConfig,
    pub dialogflow: DialogflowConfig,
    pub prediction: PredictionConfig,
    pub wearable: WearableConfig,
    pub monitor: MonitorConfig,
}

impl BridgeConfig {
    /// Build the full configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: parse_env("BRIDGE_PORT", 8080)?,
            firestore: FirestoreConfig::from_env()?,
            dialogflow: DialogflowConfig::from_env()?,
            prediction: PredictionConfig::from_env(),
            wearable: WearableConfig::from_env()?,
            monitor: MonitorConfig::from_env()?,
        })
    }
}

/// Where a component gets its Google access tokens from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Path to a service-account JSON key; tokens are minted on demand.
    ServiceAccountFile(PathBuf),
    /// A pre-minted bearer token (local runs, emulators).
    StaticToken(SecretString),
}

impl CredentialSource {
    /// Resolve from `<file_var>` (key file path) or `<token_var>` (raw token).
    pub fn from_env(file_var: &str, token_var: &str) -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(file_var) {
            return Ok(Self::ServiceAccountFile(PathBuf::from(path)));
        }
        if let Ok(token) = std::env::var(token_var) {
            return Ok(Self::StaticToken(SecretString::from(token)));
        }
        Err(ConfigError::MissingRequired {
            key: file_var.to_string(),
            hint: format!("Set {file_var} to a service account key file or {token_var} to a bearer token"),
        })
    }
}

/// Firestore user-profile store.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub base_url: String,
    pub project_id: String,
    pub database_id: String,
    pub collection: String,
    pub credentials: CredentialSource,
}

impl FirestoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_or("FIRESTORE_BASE_URL", "https://firestore.googleapis.com"),
            project_id: env_or("GOOGLE_PROJECT_ID", DEFAULT_PROJECT_ID),
            database_id: env_or("FIRESTORE_DATABASE_ID", "usuarios"),
            collection: env_or("FIRESTORE_COLLECTION", "usuarios"),
            credentials: CredentialSource::from_env("FIRESTORE_CREDENTIALS", "FIRESTORE_ACCESS_TOKEN")?,
        })
    }
}

/// Dialogflow CX agent.
#[derive(Debug, Clone)]
pub struct DialogflowConfig {
    pub base_url: String,
    pub project_id: String,
    pub location: String,
    pub agent_id: String,
    pub language_code: String,
    pub credentials: CredentialSource,
}

impl DialogflowConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let location = env_or("DIALOGFLOW_LOCATION", "us-central1");
        let base_url = std::env::var("DIALOGFLOW_BASE_URL")
            .unwrap_or_else(|_| format!("https://{location}-dialogflow.googleapis.com"));
        let agent_id = std::env::var("DIALOGFLOW_AGENT_ID")
            .map_err(|_| ConfigError::MissingEnvVar("DIALOGFLOW_AGENT_ID".to_string()))?;

        Ok(Self {
            base_url,
            project_id: env_or("GOOGLE_PROJECT_ID", DEFAULT_PROJECT_ID),
            location,
            agent_id,
            language_code: env_or("DIALOGFLOW_LANGUAGE", "es"),
            credentials: CredentialSource::from_env(
                "DIALOGFLOW_CREDENTIALS",
                "DIALOGFLOW_ACCESS_TOKEN",
            )?,
        })
    }
}

/// Exercise recommendation and cardiovascular risk endpoints.
#[derive(Debug, Clone)]
pub struct PredictionConfig {
    pub recommendation_url: String,
    pub risk_url: String,
    /// Base URL for exercise images; `<base>/<slug>.jpg`.
    pub image_base_url: String,
}

impl PredictionConfig {
    pub fn from_env() -> Self {
        Self {
            recommendation_url: env_or(
                "RECOMMENDATION_URL",
                "https://us-central1-asistente-cardiovascular.cloudfunctions.net/predict-exercises",
            ),
            risk_url: env_or(
                "RISK_URL",
                "https://us-central1-asistente-cardiovascular.cloudfunctions.net/predict-cardio",
            ),
            image_base_url: env_or(
                "EXERCISE_IMAGE_BASE_URL",
                "https://periwinkle-beagle-1321.twil.io/assets",
            ),
        }
    }
}

/// Huawei Health OAuth client and data API.
#[derive(Debug, Clone)]
pub struct WearableConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub data_url: String,
}

impl WearableConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: require("HUAWEI_CLIENT_ID")?,
            client_secret: SecretString::from(require("HUAWEI_CLIENT_SECRET")?),
            redirect_uri: require("HUAWEI_REDIRECT_URI")?,
            scope: require("HUAWEI_SCOPE")?,
            auth_url: env_or(
                "HUAWEI_AUTH_URL",
                "https://oauth-login.cloud.huawei.com/oauth2/v3/authorize",
            ),
            token_url: env_or(
                "HUAWEI_TOKEN_URL",
                "https://oauth-login.cloud.huawei.com/oauth2/v3/token",
            ),
            data_url: env_or("HUAWEI_DATA_URL", "https://healthapi.cloud.huawei.com/data"),
        })
    }
}

/// Background vitals monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub enabled: bool,
    /// How often every cached user's vitals are polled.
    pub poll_interval: Duration,
    /// How often wearable access tokens are refreshed.
    pub token_refresh_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: Duration::from_secs(300),          // 5 minutes
            token_refresh_interval: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            enabled: parse_env("MONITOR_ENABLED", defaults.enabled)?,
            poll_interval: interval_env("MONITOR_INTERVAL_SECS", defaults.poll_interval)?,
            token_refresh_interval: interval_env(
                "TOKEN_REFRESH_INTERVAL_SECS",
                defaults.token_refresh_interval,
            )?,
        })
    }
}

/// A whole number of seconds, at least one.
fn interval_env(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    match parse_env(key, default.as_secs())? {
        0 => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "interval must be at least 1 second".to_string(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn require(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
