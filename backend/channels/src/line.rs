use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

// ---------------------------------------------------------------------------
// Webhook wire types
// ---------------------------------------------------------------------------

/// Top-level webhook payload: a batch of events.
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(rename = "replyToken")]
    pub reply_token: Option<String>,
    pub source: Option<EventSource>,
    pub message: Option<MessageContent>,
}

#[derive(Debug, Deserialize)]
pub struct EventSource {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// The two message shapes the bot reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Text(String),
    Location { lat: f64, lng: f64 },
}

impl WebhookEvent {
    /// Sender user id, when the event carries one.
    pub fn user_id(&self) -> Option<&str> {
        self.source.as_ref()?.user_id.as_deref()
    }

    /// Classify a message event; sticker/image/etc. kinds return `None`.
    pub fn inbound_message(&self) -> Option<InboundMessage> {
        if self.event_type != "message" {
            return None;
        }
        let message = self.message.as_ref()?;
        match message.kind.as_str() {
            "text" => Some(InboundMessage::Text(message.text.clone()?)),
            "location" => Some(InboundMessage::Location {
                lat: message.latitude?,
                lng: message.longitude?,
            }),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Signature verification
// ---------------------------------------------------------------------------

/// Verify the `x-line-signature` header: base64(HMAC-SHA256(secret, body)).
pub fn verify_signature(channel_secret: &str, signature: &str, body: &[u8]) -> bool {
    let mut mac = match Hmac::<Sha256>::new_from_slice(channel_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    let computed = BASE64.encode(mac.finalize().into_bytes());
    computed == signature
}
