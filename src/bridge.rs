//! Webhook bridge: turns one inbound WhatsApp message into a TwiML reply.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::actions::ActionDispatcher;
use crate::channels::twiml::MessagingResponse;
use crate::error::Result;
use crate::intent::{IntentGateway, REGISTRATION_TRIGGER};
use crate::session::{SessionCache, SessionEntry};
use crate::store::UserStore;

/// Strip the channel prefix and `+` from a sender address.
///
/// `whatsapp:+34600111222` becomes `34600111222`.
pub fn normalize_sender(from: &str) -> String {
    from.replace("whatsapp:", "").replace('+', "").trim().to_string()
}

pub struct Bridge {
    sessions: Arc<SessionCache>,
    store: Arc<dyn UserStore>,
    gateway: Arc<dyn IntentGateway>,
    actions: ActionDispatcher,
}

impl Bridge {
    pub fn new(
        sessions: Arc<SessionCache>,
        store: Arc<dyn UserStore>,
        gateway: Arc<dyn IntentGateway>,
        actions: ActionDispatcher,
    ) -> Self {
        Self {
            sessions,
            store,
            gateway,
            actions,
        }
    }

    /// Handle one message from `user_id` (already normalized).
    ///
    /// Errors are only returned for failures before reply assembly starts.
    pub async fn handle_message(&self, user_id: &str, body: &str) -> Result<MessagingResponse> {
        info!(user_id = %user_id, "Message received");

        if !self.sessions.has(user_id).await {
            let profile = self.store.get(user_id).await?;
            let entry = SessionEntry::first_contact(profile);
            info!(user_id = %user_id, state = %entry.state, "New session");
            self.sessions.put(user_id, entry).await;
        }

        let mut text = body;
        if self.sessions.acknowledge_registration(user_id).await {
            info!(user_id = %user_id, "Unregistered user; starting registration flow");
            text = REGISTRATION_TRIGGER;
        }

        let pending = self
            .sessions
            .get(user_id)
            .await
            .is_some_and(|e| e.state.is_pending());

        let result = self.gateway.detect_intent(user_id, text, pending).await?;
        info!(user_id = %user_id, intent = %result.intent_label, "Intent detected");

        let intent = result.intent();
        let mut fragments = result.reply_fragments;
        if let Some(intent) = intent {
            fragments.extend(self.actions.dispatch(intent, user_id, &result.parameters).await);
        }

        let mut response = MessagingResponse::new();
        for fragment in &fragments {
            if let Err(e) = response.push_fragment(fragment) {
                warn!(user_id = %user_id, error = %e, "Skipping reply fragment");
            }
        }
        debug!(user_id = %user_id, parts = response.len(), "Reply assembled");
        Ok(response)
    }
}
