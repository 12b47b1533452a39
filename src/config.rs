//! Configuration management

use std::fmt;
use std::time::Duration;

use reqwest::Url;
use zeroize::Zeroizing;

/// Default deadline for one upstream lookup
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 15;

/// Configuration errors. All of them are fatal before the bot connects.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Bot configuration
#[derive(Clone)]
pub struct Config {
    /// Telegram bot token
    pub bot_token: Zeroizing<String>,

    /// Lookup endpoint prefix; the identifier is appended URL-encoded
    pub lookup_base_url: String,

    /// Shared access code
    pub access_code: Zeroizing<String>,

    /// Show address, names and member ids unmasked
    pub show_sensitive: bool,

    /// Deadline for one upstream call
    pub lookup_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values are treated as unset
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("TELOXIDE_TOKEN")
            .or_else(|| get("TELEGRAM_BOT_TOKEN"))
            .ok_or(ConfigError::Missing("TELOXIDE_TOKEN"))?;

        let lookup_base_url = get("LOOKUP_BASE_URL")
            .map(|v| v.trim().to_string())
            .ok_or(ConfigError::Missing("LOOKUP_BASE_URL"))?;
        validate_base_url(&lookup_base_url)?;

        let access_code = get("ACCESS_CODE").ok_or(ConfigError::Missing("ACCESS_CODE"))?;

        let show_sensitive = get("SHOW_SENSITIVE")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        let lookup_timeout_secs = match get("LOOKUP_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    name: "LOOKUP_TIMEOUT_SECS",
                    reason: format!("expected a positive number of seconds, got {:?}", raw),
                })?,
            None => DEFAULT_LOOKUP_TIMEOUT_SECS,
        };

        Ok(Self {
            bot_token: Zeroizing::new(bot_token),
            lookup_base_url,
            access_code: Zeroizing::new(access_code),
            show_sensitive,
            lookup_timeout: Duration::from_secs(lookup_timeout_secs),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("lookup_base_url", &self.lookup_base_url)
            .field("access_code", &"<redacted>")
            .field("show_sensitive", &self.show_sensitive)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn validate_base_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        name: "LOOKUP_BASE_URL",
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid {
            name: "LOOKUP_BASE_URL",
            reason: format!("unsupported scheme {:?}", other),
        }),
    }
}
