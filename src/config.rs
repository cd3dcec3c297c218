//! Configuration for the hook service.

use serde::Deserialize;
use std::path::Path;

use crate::{HookError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/hooks.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/hooks.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Almanax calendar polling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AlmanaxConfig {
    /// Whether calendar feeds are polled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tick interval in seconds.
    #[serde(default = "default_almanax_polling_rate")]
    pub polling_rate_secs: u64,
    /// Base URL of the calendar API.
    #[serde(default = "default_almanax_api_url")]
    pub api_url: String,
    /// Game path segment of the calendar API.
    #[serde(default = "default_almanax_game")]
    pub game: String,
    /// Timezone the calendar API keys its days by.
    #[serde(default = "default_almanax_source_timezone")]
    pub source_timezone: String,
    /// Number of days requested per fetch.
    #[serde(default = "default_almanax_range_size")]
    pub range_size: u32,
    /// Delay between starting two calendar listeners, in milliseconds.
    #[serde(default = "default_almanax_start_stagger")]
    pub start_stagger_ms: u64,
    /// Avatar shown on calendar messages.
    #[serde(default = "default_almanax_avatar_url")]
    pub avatar_url: String,
}

fn default_true() -> bool {
    true
}

fn default_almanax_polling_rate() -> u64 {
    60
}

fn default_almanax_api_url() -> String {
    "https://api.dofusdu.de".to_string()
}

fn default_almanax_game() -> String {
    "dofus3".to_string()
}

fn default_almanax_source_timezone() -> String {
    "Europe/Paris".to_string()
}

fn default_almanax_range_size() -> u32 {
    33
}

fn default_almanax_start_stagger() -> u64 {
    1000
}

fn default_almanax_avatar_url() -> String {
    "https://discord.dofusdude.com/almanax_daily.jpg".to_string()
}

impl Default for AlmanaxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            polling_rate_secs: default_almanax_polling_rate(),
            api_url: default_almanax_api_url(),
            game: default_almanax_game(),
            source_timezone: default_almanax_source_timezone(),
            range_size: default_almanax_range_size(),
            start_stagger_ms: default_almanax_start_stagger(),
            avatar_url: default_almanax_avatar_url(),
        }
    }
}

/// RSS polling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RssConfig {
    /// Whether RSS feeds are polled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tick interval in seconds.
    #[serde(default = "default_rss_polling_rate")]
    pub polling_rate_secs: u64,
    /// Upper bound on items treated as new in one poll.
    ///
    /// Applies when the recorded baseline no longer appears in the feed.
    #[serde(default = "default_rss_max_new_items")]
    pub max_new_items_per_poll: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_rss_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Connection timeout in seconds.
    #[serde(default = "default_rss_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    #[serde(default = "default_rss_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_rss_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_rss_max_redirects")]
    pub max_redirects: usize,
    /// Avatar shown on RSS messages.
    #[serde(default = "default_rss_avatar_url")]
    pub avatar_url: String,
}

fn default_rss_polling_rate() -> u64 {
    300 // 5 minutes
}

fn default_rss_max_new_items() -> usize {
    10
}

fn default_rss_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_rss_connect_timeout() -> u64 {
    10
}

fn default_rss_read_timeout() -> u64 {
    20
}

fn default_rss_total_timeout() -> u64 {
    30
}

fn default_rss_max_redirects() -> usize {
    5
}

fn default_rss_avatar_url() -> String {
    "https://discord.dofusdude.com/ankama_rss_logo.jpg".to_string()
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            polling_rate_secs: default_rss_polling_rate(),
            max_new_items_per_poll: default_rss_max_new_items(),
            max_feed_size_bytes: default_rss_max_feed_size(),
            connect_timeout_secs: default_rss_connect_timeout(),
            read_timeout_secs: default_rss_read_timeout(),
            total_timeout_secs: default_rss_total_timeout(),
            max_redirects: default_rss_max_redirects(),
            avatar_url: default_rss_avatar_url(),
        }
    }
}

/// Twitter timeline polling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TwitterConfig {
    /// Whether timelines are polled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tick interval in seconds.
    #[serde(default = "default_twitter_polling_rate")]
    pub polling_rate_secs: u64,
    /// Base URL of the timeline API.
    #[serde(default = "default_twitter_api_url")]
    pub api_url: String,
    /// Bearer token for the timeline API.
    #[serde(default)]
    pub bearer_token: String,
    /// Posts requested per poll.
    #[serde(default = "default_twitter_max_results")]
    pub max_results: u32,
}

fn default_twitter_polling_rate() -> u64 {
    300
}

fn default_twitter_api_url() -> String {
    "https://api.twitter.com".to_string()
}

fn default_twitter_max_results() -> u32 {
    5
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            polling_rate_secs: default_twitter_polling_rate(),
            api_url: default_twitter_api_url(),
            bearer_token: String::new(),
            max_results: default_twitter_max_results(),
        }
    }
}

/// Outbound delivery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Per-callback request timeout in seconds.
    #[serde(default = "default_delivery_timeout")]
    pub request_timeout_secs: u64,
    /// Send through the batch sender instead of posting directly.
    #[serde(default)]
    pub batch_enabled: bool,
    /// Endpoint of the batch sender.
    #[serde(default)]
    pub batch_sender_url: String,
}

fn default_delivery_timeout() -> u64 {
    30
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_delivery_timeout(),
            batch_enabled: false,
            batch_sender_url: String::new(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Almanax configuration.
    #[serde(default)]
    pub almanax: AlmanaxConfig,
    /// RSS configuration.
    #[serde(default)]
    pub rss: RssConfig,
    /// Twitter configuration.
    #[serde(default)]
    pub twitter: TwitterConfig,
    /// Delivery configuration.
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(HookError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| HookError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `HOOKS_TWITTER_TOKEN`: bearer token for the timeline API
    /// - `HOOKS_DATABASE_PATH`: SQLite database path
    /// - `HOOKS_BATCH_SENDER_URL`: batch sender endpoint
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(token) = non_empty_env("HOOKS_TWITTER_TOKEN") {
            self.twitter.bearer_token = token;
        }
        if let Some(path) = non_empty_env("HOOKS_DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(url) = non_empty_env("HOOKS_BATCH_SENDER_URL") {
            self.delivery.batch_sender_url = url;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.almanax.polling_rate_secs == 0
            || self.rss.polling_rate_secs == 0
            || self.twitter.polling_rate_secs == 0
        {
            return Err(HookError::Config(
                "polling rates must be greater than zero".to_string(),
            ));
        }
        if self.rss.max_new_items_per_poll == 0 {
            return Err(HookError::Config(
                "rss.max_new_items_per_poll must be greater than zero".to_string(),
            ));
        }
        crate::datetime::parse_timezone(&self.almanax.source_timezone)?;
        if self.delivery.batch_enabled && self.delivery.batch_sender_url.is_empty() {
            return Err(HookError::Config(
                "delivery.batch_enabled is set but batch_sender_url is empty. \
                 Set it in config.toml or via HOOKS_BATCH_SENDER_URL."
                    .to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
