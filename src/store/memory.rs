//! In-memory `UserStore` for tests and local runs without Firestore.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::model::{ProfileUpdate, UserProfile};
use super::traits::UserStore;
use crate::error::StoreError;

#[derive(Default)]
pub struct InMemoryUserStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored profiles.
    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.profiles.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn set(&self, user_id: &str, profile: &UserProfile) -> Result<(), StoreError> {
        self.profiles
            .write()
            .await
            .insert(user_id.to_string(), profile.clone());
        Ok(())
    }

    async fn update(&self, user_id: &str, update: &ProfileUpdate) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))?;
        profile
            .apply(update)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn delete(&self, user_id: &str) -> Result<(), StoreError> {
        self.profiles.write().await.remove(user_id);
        Ok(())
    }
}
