//! Chat webhook notifications

pub mod client;
pub mod payload;

pub use client::Notifier;
pub use payload::{Embed, EmbedField, WebhookPayload};
