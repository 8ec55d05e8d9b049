//! Action dispatcher: runs the side effect behind each actionable intent.
//!
//! Every action resolves to user-facing strings. Upstream failures are logged
//! and turned into apologies here, so nothing an action does can fail the
//! webhook request.

pub mod account;
pub mod params;
pub mod recommend;
pub mod risk;

use std::sync::Arc;

use tracing::info;

use crate::intent::Intent;
use crate::predict::HealthModels;
use crate::session::SessionCache;
use crate::store::UserStore;
use crate::wearable::WearableService;

pub use params::Parameters;

pub struct ActionDispatcher {
    store: Arc<dyn UserStore>,
    sessions: Arc<SessionCache>,
    models: Arc<dyn HealthModels>,
    wearable: Arc<WearableService>,
    image_base_url: String,
}

impl ActionDispatcher {
    pub fn new(
        store: Arc<dyn UserStore>,
        sessions: Arc<SessionCache>,
        models: Arc<dyn HealthModels>,
        wearable: Arc<WearableService>,
        image_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            sessions,
            models,
            wearable,
            image_base_url: image_base_url.into(),
        }
    }

    /// Run the action for `intent` and return the fragments to append to the reply.
    pub async fn dispatch(&self, intent: Intent, user_id: &str, params: &Parameters) -> Vec<String> {
        info!(user_id = %user_id, intent = %intent, "Dispatching action");
        match intent {
            Intent::Register => {
                vec![account::register(self.store.as_ref(), &self.sessions, user_id, params).await]
            }
            Intent::FetchWearableData => vec![self.wearable.report(user_id).await.message()],
            Intent::GenerateRecommendation => {
                recommend::recommend(self.models.as_ref(), &self.image_base_url, user_id, params)
                    .await
            }
            Intent::FetchRiskAssessment => {
                risk::assess(
                    self.models.as_ref(),
                    self.store.as_ref(),
                    &self.sessions,
                    user_id,
                )
                .await
            }
            Intent::DeleteAccount => {
                vec![account::delete_account(self.store.as_ref(), &self.sessions, user_id).await]
            }
        }
    }
}
