//! Cluster membership configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Heartbeat and liveness settings shared by every node of the fleet
///
/// All nodes should run with the same timeout, otherwise they disagree on
/// which peers are alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// How often a node refreshes its own heartbeat and runs an election
    pub heartbeat_interval_secs: u64,

    /// Heartbeat age after which a node counts as dead
    pub heartbeat_timeout_secs: u64,

    /// How often stale nodes are swept to OFFLINE
    pub sweep_interval_secs: u64,

    /// Hostname recorded on the node row; the machine name when unset
    pub hostname: Option<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 5,
            heartbeat_timeout_secs: 15,
            sweep_interval_secs: 10,
            hostname: None,
        }
    }
}

impl ClusterConfig {
    /// Create a new config builder
    pub fn builder() -> ClusterConfigBuilder {
        ClusterConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "heartbeat_interval_secs".to_string(),
                reason: "Must be at least 1 second".to_string(),
            });
        }

        if self.heartbeat_timeout_secs <= self.heartbeat_interval_secs {
            return Err(ConfigError::InvalidValue {
                field: "heartbeat_timeout_secs".to_string(),
                reason: "Timeout must be greater than interval".to_string(),
            });
        }

        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sweep_interval_secs".to_string(),
                reason: "Must be at least 1 second".to_string(),
            });
        }

        if matches!(&self.hostname, Some(h) if h.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "hostname".to_string(),
                reason: "Must not be blank".to_string(),
            });
        }

        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Liveness window as a chrono duration, for comparisons against stored timestamps
    pub fn heartbeat_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.heartbeat_timeout_secs).unwrap_or(i64::MAX / 1000))
    }

    /// Configured hostname or the local machine name
    pub fn resolved_hostname(&self) -> String {
        self.hostname
            .clone()
            .unwrap_or_else(crate::utils::local_hostname)
    }
}

/// Builder for ClusterConfig
#[derive(Debug, Default)]
pub struct ClusterConfigBuilder {
    heartbeat_interval_secs: Option<u64>,
    heartbeat_timeout_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
    hostname: Option<String>,
}

impl ClusterConfigBuilder {
    /// Set heartbeat interval
    pub fn heartbeat_interval_secs(mut self, secs: u64) -> Self {
        self.heartbeat_interval_secs = Some(secs);
        self
    }

    /// Set heartbeat timeout
    pub fn heartbeat_timeout_secs(mut self, secs: u64) -> Self {
        self.heartbeat_timeout_secs = Some(secs);
        self
    }

    /// Set sweep interval
    pub fn sweep_interval_secs(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = Some(secs);
        self
    }

    /// Override the recorded hostname
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Build the config
    pub fn build(self) -> Result<ClusterConfig, ConfigError> {
        let defaults = ClusterConfig::default();
        let config = ClusterConfig {
            heartbeat_interval_secs: self
                .heartbeat_interval_secs
                .unwrap_or(defaults.heartbeat_interval_secs),
            heartbeat_timeout_secs: self
                .heartbeat_timeout_secs
                .unwrap_or(defaults.heartbeat_timeout_secs),
            sweep_interval_secs: self.sweep_interval_secs.unwrap_or(defaults.sweep_interval_secs),
            hostname: self.hostname,
        };

        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
