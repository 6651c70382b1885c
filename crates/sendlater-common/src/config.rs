//! Configuration for Sendlater

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Mail capability configuration
    #[serde(default)]
    pub mail: MailConfig,

    /// Sending policy configuration
    #[serde(default)]
    pub sending: SendingConfig,

    /// Follow-up engine configuration
    #[serde(default)]
    pub followup: FollowUpConfig,

    /// Control API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            mail: MailConfig::default(),
            sending: SendingConfig::default(),
            followup: FollowUpConfig::default(),
            api: ApiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path (":memory:" for ephemeral state)
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("/var/lib/sendlater/sendlater.db")
}

fn default_max_connections() -> u32 {
    5
}

/// Mail capability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Base URL of the external mail API
    #[serde(default = "default_mail_base_url")]
    pub base_url: String,

    /// Address sends originate from
    #[serde(default = "default_from_address")]
    pub from_address: String,

    /// Bearer token for the mail API; falls back to the
    /// SENDLATER_MAIL_TOKEN environment variable when unset
    pub token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            base_url: default_mail_base_url(),
            from_address: default_from_address(),
            token: None,
            timeout_secs: default_mail_timeout(),
        }
    }
}

fn default_mail_base_url() -> String {
    "https://mail.googleapis.com/v1/users/me".to_string()
}

fn default_from_address() -> String {
    "me".to_string()
}

fn default_mail_timeout() -> u64 {
    30
}

/// Sending policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendingConfig {
    /// Maximum sends per calendar day
    #[serde(default = "default_daily_limit")]
    pub daily_limit: i64,

    /// Delay between consecutive bulk sends in milliseconds
    #[serde(default = "default_bulk_delay_ms")]
    pub bulk_delay_ms: u64,
}

impl Default for SendingConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
            bulk_delay_ms: default_bulk_delay_ms(),
        }
    }
}

fn default_daily_limit() -> i64 {
    500
}

fn default_bulk_delay_ms() -> u64 {
    1500
}

/// Follow-up engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpConfig {
    /// Minutes between rule sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_minutes: u64,

    /// Maximum candidate messages fetched per rule per sweep
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            sweep_interval_minutes: default_sweep_interval(),
            candidate_limit: default_candidate_limit(),
        }
    }
}

fn default_sweep_interval() -> u64 {
    360
}

fn default_candidate_limit() -> usize {
    25
}

/// Control API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind address; loopback by default, this is a single-user control
    /// surface for the UI layer
    #[serde(default = "default_api_bind")]
    pub bind: String,

    /// API port
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: default_api_bind(),
            port: default_api_port(),
        }
    }
}

fn default_api_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8458
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from default locations, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        let paths = [
            std::path::PathBuf::from("./config.toml"),
            std::path::PathBuf::from("/etc/sendlater/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Config::default())
    }
}
