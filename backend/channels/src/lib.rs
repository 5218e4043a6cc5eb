//! LINE Messaging API transport.
//!
//! Inbound: webhook envelope wire types and `x-line-signature` verification
//! (base64-encoded HMAC-SHA256 of the raw body with the channel secret).
//! Outbound: reply and broadcast via the Messaging API with a bearer token.

pub mod client;
pub mod line;

pub use client::LineClient;
pub use line::{verify_signature, InboundMessage, WebhookEnvelope, WebhookEvent};
