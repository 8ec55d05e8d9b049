//! Wearable reports and token upkeep for linked users.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::client::{AuthorizationLink, WearableApi};
use super::vitals::VitalAlert;
use crate::session::SessionCache;
use crate::store::{ProfileUpdate, UserStore, WearableTokens};

const PROFILE_MISSING: &str = "No se encontraron datos del usuario.";
const ALL_NORMAL: &str = "Todos tus signos vitales están dentro de los rangos normales.";
const NOT_LINKED: &str = "Tu Huawei Watch todavía no está conectado.";
const UNAVAILABLE: &str = "No se pudo obtener datos de tu Huawei Watch.";
const CONNECTED: &str =
    "Conexión con Huawei Watch exitosa. Ahora puedes obtener tus datos de salud.";
const CONNECT_FAILED: &str = "No se pudo completar la conexión con Huawei. Inténtalo nuevamente.";
const LINK_INVALID: &str =
    "El enlace de autorización no es válido o ha caducado. Pide uno nuevo por WhatsApp.";

/// How long an issued authorization link stays redeemable by default.
pub const LINK_TTL: Duration = Duration::from_secs(30 * 60);

/// Outcome of one wearable data fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum WearableReport {
    ProfileMissing,
    /// No linked device and no link issued.
    NotLinked,
    /// No linked device; the user must open this URL first.
    AuthorizationRequired(String),
    Alerts(Vec<VitalAlert>),
    Normal,
    /// The store or the vendor API failed.
    Unavailable,
}

impl WearableReport {
    /// The single user-facing message for this outcome.
    pub fn message(&self) -> String {
        match self {
            Self::ProfileMissing => PROFILE_MISSING.to_string(),
            Self::NotLinked => NOT_LINKED.to_string(),
            Self::AuthorizationRequired(url) => {
                format!("Para conectar tu Huawei Watch, ingresa a: {url}")
            }
            Self::Alerts(alerts) => alerts
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Normal => ALL_NORMAL.to_string(),
            Self::Unavailable => UNAVAILABLE.to_string(),
        }
    }
}

/// Result of a token refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    /// No cached profile or no refresh token; nothing to do.
    Skipped,
    /// The vendor or the store failed; prior tokens are untouched.
    Failed,
}

/// Result of completing an authorization callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    /// The vendor or the store failed.
    Failed,
    /// The `state` was never issued, already used, or expired.
    UnknownState,
}

impl ConnectOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Connected => CONNECTED,
            Self::Failed => CONNECT_FAILED,
            Self::UnknownState => LINK_INVALID,
        }
    }
}

struct PendingLink {
    user_id: String,
    issued_at: Instant,
}

pub struct WearableService {
    api: Arc<dyn WearableApi>,
    store: Arc<dyn UserStore>,
    sessions: Arc<SessionCache>,
    link: AuthorizationLink,
    /// Issued `state` values, keyed by nonce.
    pending: RwLock<HashMap<String, PendingLink>>,
    link_ttl: Duration,
}

impl WearableService {
    pub fn new(
        api: Arc<dyn WearableApi>,
        store: Arc<dyn UserStore>,
        sessions: Arc<SessionCache>,
        link: AuthorizationLink,
    ) -> Self {
        Self {
            api,
            store,
            sessions,
            link,
            pending: RwLock::new(HashMap::new()),
            link_ttl: LINK_TTL,
        }
    }

    /// Override how long authorization links stay redeemable.
    pub fn with_link_ttl(mut self, ttl: Duration) -> Self {
        self.link_ttl = ttl;
        self
    }

    /// Issue a one-time authorization URL for `user_id`.
    pub async fn authorization_url(&self, user_id: &str) -> String {
        let state = uuid::Uuid::new_v4().simple().to_string();
        let mut pending = self.pending.write().await;
        let ttl = self.link_ttl;
        pending.retain(|_, link| link.issued_at.elapsed() < ttl);
        pending.insert(
            state.clone(),
            PendingLink {
                user_id: user_id.to_string(),
                issued_at: Instant::now(),
            },
        );
        drop(pending);

        self.link.with_state(&state)
    }

    /// Consume an issued `state`, returning its user if still valid.
    async fn redeem(&self, state: &str) -> Option<String> {
        let link = self.pending.write().await.remove(state)?;
        (link.issued_at.elapsed() < self.link_ttl).then_some(link.user_id)
    }

    /// Fetch and evaluate the user's latest vitals, issuing an authorization
    /// link if no device is linked.
    pub async fn report(&self, user_id: &str) -> WearableReport {
        match self.check(user_id).await {
            WearableReport::NotLinked => {
                debug!(user_id = %user_id, "No wearable linked; sending authorization link");
                WearableReport::AuthorizationRequired(self.authorization_url(user_id).await)
            }
            report => report,
        }
    }

    /// Fetch and evaluate the user's latest vitals without issuing links.
    pub async fn check(&self, user_id: &str) -> WearableReport {
        let profile = match self.sessions.load_profile(user_id, self.store.as_ref()).await {
            Ok(Some(profile)) => profile,
            Ok(None) => return WearableReport::ProfileMissing,
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to load profile for wearable data");
                return WearableReport::Unavailable;
            }
        };

        let Some(tokens) = profile.wearable_tokens() else {
            return WearableReport::NotLinked;
        };

        info!(user_id = %user_id, "Fetching wearable vitals");
        match self.api.fetch_vitals(&tokens.access_token).await {
            Ok(vitals) => {
                let alerts = vitals.evaluate();
                if alerts.is_empty() {
                    WearableReport::Normal
                } else {
                    WearableReport::Alerts(alerts)
                }
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to fetch wearable vitals");
                WearableReport::Unavailable
            }
        }
    }

    /// Exchange the cached refresh token for a new access token.
    ///
    /// The store is written first; the cache only changes once the store has
    /// accepted the new token. No retries.
    pub async fn refresh_token(&self, user_id: &str) -> RefreshOutcome {
        let Some(tokens) = self
            .sessions
            .get(user_id)
            .await
            .and_then(|e| e.profile)
            .and_then(|p| p.wearable_tokens())
        else {
            return RefreshOutcome::Skipped;
        };

        info!(user_id = %user_id, "Refreshing wearable access token");
        let grant = match self.api.refresh_access_token(&tokens.refresh_token).await {
            Ok(grant) => grant,
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Wearable token refresh failed");
                return RefreshOutcome::Failed;
            }
        };

        // Keep the old refresh token unless the vendor rotated it.
        let refreshed = WearableTokens {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.unwrap_or(tokens.refresh_token.clone()),
        };
        let update = if refreshed.refresh_token == tokens.refresh_token {
            ProfileUpdate::access_token(&refreshed.access_token)
        } else {
            ProfileUpdate::wearable_tokens(&refreshed)
        };

        if let Err(e) = self.store.update(user_id, &update).await {
            error!(user_id = %user_id, error = %e, "Failed to persist refreshed wearable token");
            return RefreshOutcome::Failed;
        }
        self.cache_tokens(user_id, refreshed).await;

        info!(user_id = %user_id, expires_in = ?grant.expires_in, "Wearable access token refreshed");
        RefreshOutcome::Refreshed
    }

    /// Complete the authorization-code flow for an issued `state`.
    ///
    /// The state is consumed before the code exchange, so each link works once.
    pub async fn connect(&self, state: &str, code: &str) -> ConnectOutcome {
        let Some(user_id) = self.redeem(state).await else {
            warn!("Wearable callback with unknown or expired state");
            return ConnectOutcome::UnknownState;
        };

        info!(user_id = %user_id, "Exchanging wearable authorization code");
        let grant = match self.api.exchange_code(code).await {
            Ok(grant) => grant,
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Wearable code exchange failed");
                return ConnectOutcome::Failed;
            }
        };

        let Some(refresh_token) = grant.refresh_token else {
            warn!(user_id = %user_id, "Token endpoint returned no refresh token");
            return ConnectOutcome::Failed;
        };
        let tokens = WearableTokens {
            access_token: grant.access_token,
            refresh_token,
        };

        if let Err(e) = self
            .store
            .update(&user_id, &ProfileUpdate::wearable_tokens(&tokens))
            .await
        {
            error!(user_id = %user_id, error = %e, "Failed to store wearable tokens");
            return ConnectOutcome::Failed;
        }
        self.cache_tokens(&user_id, tokens).await;

        info!(user_id = %user_id, expires_in = ?grant.expires_in, "Wearable linked");
        ConnectOutcome::Connected
    }

    async fn cache_tokens(&self, user_id: &str, tokens: WearableTokens) {
        let cached = self
            .sessions
            .update_profile(user_id, |profile| {
                profile.wearable_access_token = Some(tokens.access_token);
                profile.wearable_refresh_token = Some(tokens.refresh_token);
            })
            .await;
        if !cached {
            debug!(user_id = %user_id, "No cached profile to update with wearable tokens");
        }
    }
}
