use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use cardio_assist::actions::ActionDispatcher;
use cardio_assist::auth::token_source;
use cardio_assist::bridge::Bridge;
use cardio_assist::channels::bridge_routes;
use cardio_assist::config::BridgeConfig;
use cardio_assist::intent::DialogflowClient;
use cardio_assist::monitor::spawn_vitals_monitor;
use cardio_assist::predict::CloudFunctionModels;
use cardio_assist::session::SessionCache;
use cardio_assist::store::FirestoreUserStore;
use cardio_assist::wearable::{AuthorizationLink, HuaweiHealthClient, WearableService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BridgeConfig::from_env().context("Failed to load configuration")?;

    eprintln!("🫀 Cardio Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook: http://0.0.0.0:{}/webhook", config.port);
    eprintln!(
        "   Dialogflow agent: {} ({})",
        config.dialogflow.agent_id, config.dialogflow.location
    );
    eprintln!(
        "   Firestore: {}/{}",
        config.firestore.project_id, config.firestore.collection
    );

    let http = reqwest::Client::new();

    // ── Google credentials ───────────────────────────────────────────────
    let firestore_tokens = token_source(&config.firestore.credentials, http.clone())
        .context("Failed to load Firestore credentials")?;
    let dialogflow_tokens = token_source(&config.dialogflow.credentials, http.clone())
        .context("Failed to load Dialogflow credentials")?;

    // ── Collaborators ────────────────────────────────────────────────────
    let sessions = SessionCache::new();
    let store = Arc::new(FirestoreUserStore::new(
        &config.firestore,
        http.clone(),
        firestore_tokens,
    ));
    let gateway = Arc::new(DialogflowClient::new(
        &config.dialogflow,
        http.clone(),
        dialogflow_tokens,
    ));
    let models = Arc::new(CloudFunctionModels::new(&config.prediction, http.clone()));
    let wearable = Arc::new(WearableService::new(
        Arc::new(HuaweiHealthClient::new(&config.wearable, http.clone())),
        store.clone(),
        sessions.clone(),
        AuthorizationLink::from_config(&config.wearable),
    ));

    let actions = ActionDispatcher::new(
        store.clone(),
        sessions.clone(),
        models,
        wearable.clone(),
        config.prediction.image_base_url.clone(),
    );
    let bridge = Arc::new(Bridge::new(sessions.clone(), store, gateway, actions));

    // ── Background monitor ───────────────────────────────────────────────
    let monitor = if config.monitor.enabled {
        eprintln!(
            "   Monitor: every {}s (token refresh every {}s)",
            config.monitor.poll_interval.as_secs(),
            config.monitor.token_refresh_interval.as_secs()
        );
        Some(spawn_vitals_monitor(
            wearable.clone(),
            sessions.clone(),
            config.monitor.clone(),
        ))
    } else {
        eprintln!("   Monitor: disabled");
        None
    };

    // ── HTTP server ──────────────────────────────────────────────────────
    let app = bridge_routes(bridge, wearable);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Webhook server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Webhook server failed")?;

    if let Some(monitor) = monitor {
        monitor.shutdown().await;
    }
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
