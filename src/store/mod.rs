//! Persistence layer for user profiles, in Firestore or in memory.

pub mod firestore;
pub mod memory;
pub mod model;
pub mod traits;

pub use firestore::FirestoreUserStore;
pub use memory::InMemoryUserStore;
pub use model::{ProfileUpdate, UNKNOWN_GENDER, UNKNOWN_NAME, UserProfile, WearableTokens};
pub use traits::UserStore;
