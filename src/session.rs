//! Session cache: in-memory per-user state shared by every component.
//!
//! Each operation takes the lock once; nothing holds it across operations, so
//! concurrent requests for the same user are last-write-wins.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::store::{UserProfile, UserStore};

/// Registration state of a session.
///
/// Progresses one way: PendingRegistration → Active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No profile was found on first contact; the registration trigger has not fired yet.
    PendingRegistration,
    Active,
}

impl SessionState {
    /// Initial state for a newly seen user.
    pub fn for_profile(profile: Option<&UserProfile>) -> Self {
        match profile {
            Some(_) => Self::Active,
            None => Self::PendingRegistration,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::PendingRegistration)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PendingRegistration => "pending_registration",
            Self::Active => "active",
        };
        write!(f, "{s}")
    }
}

/// Cached per-user state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEntry {
    pub profile: Option<UserProfile>,
    pub state: SessionState,
}

impl SessionEntry {
    /// Entry for a user seen for the first time.
    pub fn first_contact(profile: Option<UserProfile>) -> Self {
        let state = SessionState::for_profile(profile.as_ref());
        Self { profile, state }
    }

    /// Entry for a user that has just registered.
    pub fn registered(profile: UserProfile) -> Self {
        Self {
            profile: Some(profile),
            state: SessionState::Active,
        }
    }
}

/// Process-wide map of user identifier → session entry. Unbounded, never persisted.
#[derive(Default)]
pub struct SessionCache {
    entries: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn get(&self, user_id: &str) -> Option<SessionEntry> {
        self.entries.read().await.get(user_id).cloned()
    }

    pub async fn put(&self, user_id: &str, entry: SessionEntry) {
        debug!(user_id = %user_id, state = %entry.state, "Session entry stored");
        self.entries.write().await.insert(user_id.to_string(), entry);
    }

    /// Remove an entry. Returns whether one existed.
    pub async fn delete(&self, user_id: &str) -> bool {
        let removed = self.entries.write().await.remove(user_id).is_some();
        if removed {
            debug!(user_id = %user_id, "Session entry removed");
        }
        removed
    }

    pub async fn has(&self, user_id: &str) -> bool {
        self.entries.read().await.contains_key(user_id)
    }

    /// Snapshot of every cached user identifier.
    pub async fn ids(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Acknowledge a pending registration: PendingRegistration → Active.
    ///
    /// Returns true only for the call that performed the transition.
    pub async fn acknowledge_registration(&self, user_id: &str) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(user_id) {
            Some(entry) if entry.state.is_pending() => {
                entry.state = SessionState::Active;
                true
            }
            _ => false,
        }
    }

    /// Cache a profile fetched from the store without changing the entry's state.
    /// Creates an `Active` entry if none exists.
    pub async fn cache_profile(&self, user_id: &str, profile: UserProfile) {
        let mut entries = self.entries.write().await;
        match entries.get_mut(user_id) {
            Some(entry) => entry.profile = Some(profile),
            None => {
                entries.insert(user_id.to_string(), SessionEntry::registered(profile));
            }
        }
    }

    /// Cached profile, falling back to the store on a miss. A profile found in
    /// the store is cached without changing the entry's state.
    pub async fn load_profile(
        &self,
        user_id: &str,
        store: &dyn UserStore,
    ) -> Result<Option<UserProfile>, StoreError> {
        if let Some(profile) = self.get(user_id).await.and_then(|e| e.profile) {
            debug!(user_id = %user_id, "Using cached profile");
            return Ok(Some(profile));
        }

        let profile = store.get(user_id).await?;
        if let Some(ref found) = profile {
            self.cache_profile(user_id, found.clone()).await;
        }
        Ok(profile)
    }

    /// Mutate the cached profile in place. Returns false if there is no cached profile.
    pub async fn update_profile<F>(&self, user_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut UserProfile),
    {
        let mut entries = self.entries.write().await;
        match entries.get_mut(user_id).and_then(|e| e.profile.as_mut()) {
            Some(profile) => {
                f(profile);
                true
            }
            None => false,
        }
    }
}
