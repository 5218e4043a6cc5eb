//! Daily PM2.5 report broadcast.
//!
//! Fetches the public report page, pulls out the report image URL, and
//! broadcasts the image to every follower. When no image can be found the
//! broadcast degrades to the Bangkok-average text report. The outcome is a
//! plain bool: failures are logged here and never retried within a tick.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info, warn};

use dustline_airquality::{report, StationProvider};
use dustline_channels::LineClient;

/// Hard ceiling on the report-page fetch so a slow origin cannot stall the
/// scheduler tick.
const PAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Report images on the page are hosted on the Google Sites CDN.
static IMAGE_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https://lh3\.googleusercontent\.com/sitesv/[^"'\s)]+"#)
        .expect("image url pattern")
});

pub struct BroadcastService {
    http: reqwest::Client,
    page_url: String,
    line: Arc<LineClient>,
    stations: Arc<dyn StationProvider>,
}

impl BroadcastService {
    pub fn new(
        page_url: impl Into<String>,
        line: Arc<LineClient>,
        stations: Arc<dyn StationProvider>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(PAGE_FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            page_url: page_url.into(),
            line,
            stations,
        }
    }

    /// Run one broadcast. Returns whether anything was delivered.
    pub async fn run(&self) -> bool {
        match self.fetch_image_url().await {
            Ok(image_url) => match self.line.broadcast_image(&image_url).await {
                Ok(()) => {
                    info!("PM2.5 report image broadcast");
                    true
                }
                Err(e) => {
                    error!(error = %e, "Image broadcast failed");
                    false
                }
            },
            Err(e) => {
                warn!(error = %e, "No report image available, falling back to text");
                self.broadcast_text_fallback().await
            }
        }
    }

    async fn fetch_image_url(&self) -> Result<String> {
        let html = self
            .http
            .get(&self.page_url)
            .send()
            .await
            .context("report page request failed")?
            .error_for_status()
            .context("report page returned an error status")?
            .text()
            .await
            .context("report page body unreadable")?;

        extract_image_url(&html).context("no report image on the page")
    }

    async fn broadcast_text_fallback(&self) -> bool {
        let summary = match self.stations.bangkok_average().await {
            Ok(Some(summary)) => summary,
            Ok(None) => {
                error!("No Bangkok readings for the text fallback");
                return false;
            }
            Err(e) => {
                error!(error = %e, "Station feed unavailable for the text fallback");
                return false;
            }
        };

        match self.line.broadcast_text(&report::area_report(&summary)).await {
            Ok(()) => {
                info!("PM2.5 text report broadcast");
                true
            }
            Err(e) => {
                error!(error = %e, "Text broadcast failed");
                false
            }
        }
    }
}

/// First report-image URL in the page HTML.
pub fn extract_image_url(html: &str) -> Option<String> {
    IMAGE_URL_PATTERN
        .find(html)
        .map(|m| m.as_str().to_string())
}
