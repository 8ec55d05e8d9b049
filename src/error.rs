//! Error types for the cardio assistant bridge.

/// Top-level error type for the bridge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("User store error: {0}")]
    Store(#[from] StoreError),

    #[error("Intent gateway error: {0}")]
    Intent(#[from] IntentError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cloud access-token minting errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid service account credentials: {0}")]
    InvalidCredentials(String),

    #[error("Failed to sign token assertion: {0}")]
    Signing(String),

    #[error("Token request failed: {0}")]
    TokenRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// User profile store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Request(String),

    #[error("Store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Conversational-AI gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("detectIntent request failed: {0}")]
    RequestFailed(String),

    #[error("detectIntent returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid detectIntent response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Errors from the prediction and wearable services.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{service} request failed: {reason}")]
    RequestFailed { service: String, reason: String },

    #[error("{service} returned {status}")]
    Status { service: String, status: u16 },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: String, reason: String },
}

impl UpstreamError {
    pub(crate) fn request(service: &str, e: impl std::fmt::Display) -> Self {
        Self::RequestFailed {
            service: service.to_string(),
            reason: e.to_string(),
        }
    }

    pub(crate) fn invalid(service: &str, e: impl std::fmt::Display) -> Self {
        Self::InvalidResponse {
            service: service.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Messaging channel errors (reply assembly).
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Invalid media URL {url}: {reason}")]
    InvalidMedia { url: String, reason: String },
}

/// Result type alias for the bridge.
pub type Result<T> = std::result::Result<T, Error>;
