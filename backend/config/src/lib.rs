//! Dustline runtime configuration.
//!
//! Everything comes from environment variables with sensible defaults; only
//! the LINE channel credentials are required. Startup aborts when they are
//! missing — every other failure degrades at the call site instead.

use anyhow::{bail, Result};
use serde::Deserialize;

/// A single daily broadcast firing time (wall clock in `timezone`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BroadcastTime {
    pub hour: u8,
    pub minute: u8,
}

/// Dustline runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// LINE channel secret (webhook signature verification)
    pub line_channel_secret: String,
    /// LINE channel access token (reply/broadcast API)
    pub line_channel_access_token: String,
    /// Path of the session snapshot file
    pub state_file: String,
    /// Air4Thai station feed URL
    pub air4thai_url: String,
    /// Page carrying the daily PM2.5 report image
    pub pm25_image_page: String,
    /// Daily broadcast firing times
    pub broadcast_times: Vec<BroadcastTime>,
    /// IANA timezone name the broadcast times are expressed in
    pub broadcast_timezone: String,
    /// Log level when RUST_LOG is unset
    pub log_level: String,
    /// Directory for rolling NDJSON log files (console-only when unset)
    pub log_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8765,
            line_channel_secret: String::new(),
            line_channel_access_token: String::new(),
            state_file: "user_states.json".to_string(),
            air4thai_url: "http://air4thai.pcd.go.th/forappV2/getAQI_JSON.php".to_string(),
            pm25_image_page: "https://sites.google.com/view/pm25plk/home".to_string(),
            broadcast_times: vec![BroadcastTime { hour: 11, minute: 0 }],
            broadcast_timezone: "Asia/Bangkok".to_string(),
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Self {
            bind_address: std::env::var("DUSTLINE_BIND").unwrap_or(defaults.bind_address),
            port: std::env::var("DUSTLINE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            line_channel_secret: std::env::var("LINE_CHANNEL_SECRET").unwrap_or_default(),
            line_channel_access_token: std::env::var("LINE_CHANNEL_ACCESS_TOKEN")
                .unwrap_or_default(),
            state_file: std::env::var("DUSTLINE_STATE_FILE").unwrap_or(defaults.state_file),
            air4thai_url: std::env::var("AIR4THAI_URL").unwrap_or(defaults.air4thai_url),
            pm25_image_page: std::env::var("PM25_IMAGE_PAGE").unwrap_or(defaults.pm25_image_page),
            broadcast_times: std::env::var("BROADCAST_TIMES")
                .ok()
                .and_then(|raw| parse_broadcast_times(&raw).ok())
                .unwrap_or(defaults.broadcast_times),
            broadcast_timezone: std::env::var("BROADCAST_TZ")
                .unwrap_or(defaults.broadcast_timezone),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_dir: std::env::var("DUSTLINE_LOG_DIR").ok(),
        }
    }

    /// Check that required settings are present. Called once at startup;
    /// a failure here is fatal by design.
    pub fn validate(&self) -> Result<()> {
        if self.line_channel_secret.is_empty() {
            bail!("LINE_CHANNEL_SECRET is not set");
        }
        if self.line_channel_access_token.is_empty() {
            bail!("LINE_CHANNEL_ACCESS_TOKEN is not set");
        }
        if self.broadcast_times.is_empty() {
            bail!("BROADCAST_TIMES parsed to an empty schedule");
        }
        Ok(())
    }
}

/// Parse a comma-separated `HH:MM` list, e.g. `"07:00,11:30"`.
pub fn parse_broadcast_times(raw: &str) -> Result<Vec<BroadcastTime>> {
    let mut times = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let Some((h, m)) = part.split_once(':') else {
            bail!("broadcast time '{}' is not HH:MM", part);
        };
        let hour: u8 = h.parse().map_err(|_| anyhow::anyhow!("hour '{}' not numeric", h))?;
        let minute: u8 = m
            .parse()
            .map_err(|_| anyhow::anyhow!("minute '{}' not numeric", m))?;
        if hour > 23 || minute > 59 {
            bail!("broadcast time '{}' out of range", part);
        }
        times.push(BroadcastTime { hour, minute });
    }
    if times.is_empty() {
        bail!("no broadcast times in '{}'", raw);
    }
    Ok(times)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 8765);
        assert_eq!(config.broadcast_timezone, "Asia/Bangkok");
        assert_eq!(config.broadcast_times, vec![BroadcastTime { hour: 11, minute: 0 }]);
    }

    #[test]
    fn test_validate_rejects_missing_credentials() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("LINE_CHANNEL_SECRET"));

        let config = Config {
            line_channel_secret: "secret".into(),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("LINE_CHANNEL_ACCESS_TOKEN"));
    }

    #[test]
    fn test_parse_broadcast_times() {
        let times = parse_broadcast_times("07:00, 11:30,18:05").unwrap();
        assert_eq!(
            times,
            vec![
                BroadcastTime { hour: 7, minute: 0 },
                BroadcastTime { hour: 11, minute: 30 },
                BroadcastTime { hour: 18, minute: 5 },
            ]
        );
    }

    #[test]
    fn test_parse_broadcast_times_rejects_garbage() {
        assert!(parse_broadcast_times("25:00").is_err());
        assert!(parse_broadcast_times("11").is_err());
        assert!(parse_broadcast_times("").is_err());
    }
}
