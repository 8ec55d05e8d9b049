//! Cardio Assist: WhatsApp bridge to a cardiovascular-health assistant.

pub mod actions;
pub mod auth;
pub mod bridge;
pub mod channels;
pub mod config;
pub mod error;
pub mod intent;
pub mod monitor;
pub mod predict;
pub mod session;
pub mod store;
pub mod wearable;
