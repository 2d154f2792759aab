//! Application configuration structs
//!
//! Loads configuration from environment variables.

use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub api: ApiSettings,
    pub realtime: RealtimeSettings,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// CRUD API client settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
}

/// Realtime update client settings
///
/// Raw values only; `maestro-realtime` turns these into durations and a
/// backoff policy.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeSettings {
    /// WebSocket endpoint, e.g. `wss://api.example.edu/realtime`
    pub url: String,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    #[serde(default = "default_reconnect_max_attempts")]
    pub reconnect_max_attempts: u32,
    #[serde(default = "default_reconnect_jitter_ms")]
    pub reconnect_jitter_ms: u64,
}

// Default value functions
fn default_app_name() -> String {
    "maestro".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_max_delay_ms() -> u64 {
    30_000
}

fn default_reconnect_max_attempts() -> u32 {
    10
}

fn default_reconnect_jitter_ms() -> u64 {
    1_000
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            api: ApiSettings {
                base_url: env::var("API_BASE_URL")
                    .map_err(|_| ConfigError::MissingVar("API_BASE_URL"))?,
            },
            realtime: RealtimeSettings {
                url: env::var("REALTIME_URL")
                    .map_err(|_| ConfigError::MissingVar("REALTIME_URL"))?,
                heartbeat_interval_secs: env_or("HEARTBEAT_INTERVAL_SECS", default_heartbeat_interval_secs),
                connect_timeout_secs: env_or("CONNECT_TIMEOUT_SECS", default_connect_timeout_secs),
                reconnect_base_delay_ms: env_or("RECONNECT_BASE_DELAY_MS", default_reconnect_base_delay_ms),
                reconnect_max_delay_ms: env_or("RECONNECT_MAX_DELAY_MS", default_reconnect_max_delay_ms),
                reconnect_max_attempts: env_or("RECONNECT_MAX_ATTEMPTS", default_reconnect_max_attempts),
                reconnect_jitter_ms: env_or("RECONNECT_JITTER_MS", default_reconnect_jitter_ms),
            },
        })
    }
}

fn env_or<T: std::str::FromStr>(var: &str, default: fn() -> T) -> T {
    env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
