use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

const REPLY_URL: &str = "https://api.line.me/v2/bot/message/reply";
const BROADCAST_URL: &str = "https://api.line.me/v2/bot/message/broadcast";

/// Outbound request timeout against the Messaging API.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound LINE Messaging API client.
pub struct LineClient {
    http: reqwest::Client,
    access_token: String,
}

impl LineClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            access_token: access_token.into(),
        }
    }

    /// Send one text reply for an inbound event's reply token.
    pub async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
        self.http
            .post(REPLY_URL)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({
                "replyToken": reply_token,
                "messages": [{ "type": "text", "text": text }]
            }))
            .send()
            .await
            .context("LINE reply request failed")?
            .error_for_status()
            .context("LINE reply rejected")?;
        Ok(())
    }

    /// Broadcast one image to all followers.
    pub async fn broadcast_image(&self, image_url: &str) -> Result<()> {
        self.http
            .post(BROADCAST_URL)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({
                "messages": [{
                    "type": "image",
                    "originalContentUrl": image_url,
                    "previewImageUrl": image_url
                }]
            }))
            .send()
            .await
            .context("LINE broadcast request failed")?
            .error_for_status()
            .context("LINE broadcast rejected")?;
        info!("Broadcast image sent");
        Ok(())
    }

    /// Broadcast one text message to all followers.
    pub async fn broadcast_text(&self, text: &str) -> Result<()> {
        self.http
            .post(BROADCAST_URL)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({
                "messages": [{ "type": "text", "text": text }]
            }))
            .send()
            .await
            .context("LINE broadcast request failed")?
            .error_for_status()
            .context("LINE broadcast rejected")?;
        info!("Broadcast text sent");
        Ok(())
    }
}
