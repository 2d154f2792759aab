//! Realtime client configuration

use crate::connection::ReconnectPolicy;
use maestro_common::RealtimeSettings;
use std::time::Duration;

/// Configuration for a [`crate::RealtimeClient`]
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// WebSocket endpoint
    pub url: String,

    /// Interval between outbound heartbeat frames
    pub heartbeat_interval: Duration,

    /// How long a connection attempt may stay half-open before it is
    /// abandoned and counted as a failure
    pub connect_timeout: Duration,

    /// Backoff policy for automatic reconnection
    pub reconnect: ReconnectPolicy,
}

impl RealtimeConfig {
    /// Create a configuration with default timings for the given endpoint
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            heartbeat_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// Build from environment-loaded settings
    #[must_use]
    pub fn from_settings(settings: &RealtimeSettings) -> Self {
        Self {
            url: settings.url.clone(),
            heartbeat_interval: Duration::from_secs(settings.heartbeat_interval_secs),
            connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
            reconnect: ReconnectPolicy {
                base_delay: Duration::from_millis(settings.reconnect_base_delay_ms),
                max_delay: Duration::from_millis(settings.reconnect_max_delay_ms),
                max_attempts: settings.reconnect_max_attempts,
                jitter_max: Duration::from_millis(settings.reconnect_jitter_ms),
            },
        }
    }

    /// Override the heartbeat interval
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Override the connection-establishment timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Override the reconnect policy
    #[must_use]
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }
}
