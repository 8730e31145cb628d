//! Extension configuration (wisp-net.toml)
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the stock behavior.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Semantically invalid value
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Tunables of the wifi/tcp extensions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetConfig {
    /// Maximum number of simultaneously open sockets
    pub socket_capacity: usize,

    /// Sleep between non-blocking receive attempts of the poller
    pub poll_interval_ms: u64,

    /// Receive timeout used when `tcp-recv` omits it
    pub default_recv_timeout_secs: f64,

    /// Largest `max-len` accepted by `tcp-recv`
    pub max_recv_len: usize,

    /// Per-channel scan time used when `wifi-scan-networks` omits it
    pub default_scan_time_secs: f64,

    /// SSIDs must be strictly shorter than this
    pub max_ssid_len: usize,

    /// Passwords must be strictly shorter than this
    pub max_password_len: usize,

    /// Upper bound on establishing a TCP connection
    pub connect_timeout_secs: u64,

    /// Post `event-wifi-disconnect` to the runtime
    pub disconnect_events: bool,

    /// TCP keep-alive and no-delay options for opened sockets
    pub keepalive: KeepaliveConfig,
}

/// Socket options applied by `tcp-connect`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeepaliveConfig {
    /// Enable SO_KEEPALIVE
    pub enabled: bool,
    /// Idle time before the first probe
    pub idle_secs: u32,
    /// Interval between probes
    pub interval_secs: u32,
    /// Failed probes before the connection is dropped
    pub count: u32,
    /// Disable Nagle's algorithm
    pub no_delay: bool,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            socket_capacity: 10,
            poll_interval_ms: 10,
            default_recv_timeout_secs: 1.0,
            max_recv_len: 65536,
            default_scan_time_secs: 0.12,
            max_ssid_len: 31,
            max_password_len: 63,
            connect_timeout_secs: 10,
            disconnect_events: true,
            keepalive: KeepaliveConfig::default(),
        }
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            idle_secs: 5,
            interval_secs: 5,
            count: 3,
            no_delay: true,
        }
    }
}

impl NetConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: NetConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.socket_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "socket_capacity must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.max_recv_len == 0 {
            return Err(ConfigError::ValidationError(
                "max_recv_len must be at least 1".to_string(),
            ));
        }
        let timeout = self.default_recv_timeout_secs;
        if timeout.is_nan() || timeout < 0.0 {
            return Err(ConfigError::ValidationError(
                "default_recv_timeout_secs must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    /// Poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Connect timeout as a Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
