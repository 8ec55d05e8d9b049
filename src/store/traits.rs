//! `UserStore` trait: the async interface for profile persistence.

use async_trait::async_trait;

use super::model::{ProfileUpdate, UserProfile};
use crate::error::StoreError;

/// Backend-agnostic user profile store keyed by user identifier.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a profile. `Ok(None)` when no document exists.
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Write a full profile, replacing any existing document.
    async fn set(&self, user_id: &str, profile: &UserProfile) -> Result<(), StoreError>;

    /// Update only the listed fields of an existing document.
    async fn update(&self, user_id: &str, update: &ProfileUpdate) -> Result<(), StoreError>;

    /// Delete a profile. Deleting a missing document is not an error.
    async fn delete(&self, user_id: &str) -> Result<(), StoreError>;
}
