//! Messaging channel: the WhatsApp webhook and its TwiML replies.

pub mod twiml;
pub mod whatsapp;

pub use twiml::MessagingResponse;
pub use whatsapp::{AppState, bridge_routes};
