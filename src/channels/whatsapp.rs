//! WhatsApp webhook (Twilio) + wearable OAuth callback + health check.

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::twiml::CONTENT_TYPE;
use crate::bridge::{Bridge, normalize_sender};
use crate::wearable::{ConnectOutcome, WearableService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<Bridge>,
    pub wearable: Arc<WearableService>,
}

/// Inbound Twilio message. Other Twilio fields are ignored.
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
    /// The one-time nonce issued with the authorization link.
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Build the Axum router for the webhook bridge.
pub fn bridge_routes(bridge: Arc<Bridge>, wearable: Arc<WearableService>) -> Router {
    let state = AppState { bridge, wearable };

    Router::new()
        .route("/webhook", post(webhook))
        .route("/oauth/wearable/callback", get(oauth_callback))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "cardio-assist"
    }))
}

// ── Webhook ─────────────────────────────────────────────────────────────

async fn webhook(State(state): State<AppState>, Form(msg): Form<InboundMessage>) -> Response {
    let user_id = normalize_sender(&msg.from);
    if user_id.is_empty() {
        warn!(from = %msg.from, "Rejecting message without sender");
        return StatusCode::BAD_REQUEST.into_response();
    }

    match state.bridge.handle_message(&user_id, &msg.body).await {
        Ok(reply) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], reply.render()).into_response(),
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Webhook processing failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// ── Wearable OAuth ──────────────────────────────────────────────────────

async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<OAuthCallback>,
) -> impl IntoResponse {
    if let Some(err) = params.error {
        warn!(error = %err, "Wearable authorization denied");
        return (StatusCode::BAD_REQUEST, "Autorización rechazada.".to_string());
    }

    let (Some(code), Some(nonce)) = (params.code, params.state) else {
        return (
            StatusCode::BAD_REQUEST,
            "Faltan los parámetros code y state.".to_string(),
        );
    };

    info!("Wearable authorization callback");
    let outcome = state.wearable.connect(&nonce, &code).await;
    let status = match outcome {
        ConnectOutcome::UnknownState => StatusCode::BAD_REQUEST,
        ConnectOutcome::Connected | ConnectOutcome::Failed => StatusCode::OK,
    };
    (status, outcome.message().to_string())
}
