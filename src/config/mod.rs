//! Configuration management for fleetcrawl nodes
//!
//! This module handles loading and validating configuration from environment variables,
//! TOML files, and command-line overrides. Every section has defaults, so a
//! config file only needs the values it changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub use crate::coordinator::config::ClusterConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Heartbeat, liveness and election timing
    pub cluster: ClusterConfig,

    /// Task assignment (leader only)
    pub scheduler: SchedulerConfig,

    /// Page fetching on every node
    pub worker: WorkerConfig,

    /// Job completion detection (leader only)
    pub lifecycle: LifecycleConfig,

    /// Shared store location
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Cycle period in milliseconds
    pub interval_ms: u64,

    /// Maximum PENDING tasks assigned per cycle
    pub batch_size: usize,

    /// Return tasks held by OFFLINE or removed nodes to PENDING before assigning
    pub reclaim_orphans: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            batch_size: 50,
            reclaim_orphans: true,
        }
    }
}

/// Crawl worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Cycle period in milliseconds
    pub interval_ms: u64,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Tasks fetched in parallel within one cycle
    pub max_concurrent_tasks: usize,

    /// Rate limit (requests per second) for this node, 0 disables it
    pub requests_per_second: u32,

    /// User agent string
    pub user_agent: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            request_timeout_secs: 15,
            max_concurrent_tasks: 4,
            requests_per_second: 10,
            user_agent: default_user_agent(),
        }
    }
}

/// Job lifecycle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Completion check period in seconds
    pub interval_secs: u64,

    /// Also complete RUNNING jobs that have nothing PENDING or ASSIGNED left
    pub complete_on_exhausted_frontier: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            complete_on_exhausted_frontier: false,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database path, shared by all nodes of a fleet
    pub sqlite_path: PathBuf,

    /// How long a statement waits on a locked database
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/fleetcrawl.db"),
            busy_timeout_ms: 5000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn default_user_agent() -> String {
    format!("fleetcrawl/{}", env!("CARGO_PKG_VERSION"))
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from `FLEETCRAWL_*` environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let cluster = ClusterConfig {
            heartbeat_interval_secs: env_or(
                "FLEETCRAWL_HEARTBEAT_INTERVAL_SECS",
                defaults.cluster.heartbeat_interval_secs,
            ),
            heartbeat_timeout_secs: env_or(
                "FLEETCRAWL_HEARTBEAT_TIMEOUT_SECS",
                defaults.cluster.heartbeat_timeout_secs,
            ),
            sweep_interval_secs: env_or(
                "FLEETCRAWL_SWEEP_INTERVAL_SECS",
                defaults.cluster.sweep_interval_secs,
            ),
            hostname: std::env::var("FLEETCRAWL_HOSTNAME").ok(),
        };

        let scheduler = SchedulerConfig {
            interval_ms: env_or("FLEETCRAWL_SCHEDULER_INTERVAL_MS", defaults.scheduler.interval_ms),
            batch_size: env_or("FLEETCRAWL_SCHEDULER_BATCH_SIZE", defaults.scheduler.batch_size),
            reclaim_orphans: env_or(
                "FLEETCRAWL_RECLAIM_ORPHANS",
                defaults.scheduler.reclaim_orphans,
            ),
        };

        let worker = WorkerConfig {
            interval_ms: env_or("FLEETCRAWL_WORKER_INTERVAL_MS", defaults.worker.interval_ms),
            request_timeout_secs: env_or(
                "FLEETCRAWL_REQUEST_TIMEOUT",
                defaults.worker.request_timeout_secs,
            ),
            max_concurrent_tasks: env_or(
                "FLEETCRAWL_MAX_CONCURRENT_TASKS",
                defaults.worker.max_concurrent_tasks,
            ),
            requests_per_second: env_or(
                "FLEETCRAWL_RATE_LIMIT",
                defaults.worker.requests_per_second,
            ),
            user_agent: std::env::var("FLEETCRAWL_USER_AGENT")
                .unwrap_or(defaults.worker.user_agent),
        };

        let lifecycle = LifecycleConfig {
            interval_secs: env_or(
                "FLEETCRAWL_LIFECYCLE_INTERVAL_SECS",
                defaults.lifecycle.interval_secs,
            ),
            complete_on_exhausted_frontier: env_or(
                "FLEETCRAWL_COMPLETE_ON_EXHAUSTED_FRONTIER",
                defaults.lifecycle.complete_on_exhausted_frontier,
            ),
        };

        let database = DatabaseConfig {
            sqlite_path: std::env::var("FLEETCRAWL_SQLITE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database.sqlite_path),
            busy_timeout_ms: env_or(
                "FLEETCRAWL_BUSY_TIMEOUT_MS",
                defaults.database.busy_timeout_ms,
            ),
        };

        let logging = LoggingConfig {
            level: std::env::var("FLEETCRAWL_LOG_LEVEL").unwrap_or(defaults.logging.level),
            format: std::env::var("FLEETCRAWL_LOG_FORMAT").unwrap_or(defaults.logging.format),
        };

        Ok(Self {
            cluster,
            scheduler,
            worker,
            lifecycle,
            database,
            logging,
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.cluster
            .validate()
            .context("Invalid cluster configuration")?;

        if self.scheduler.interval_ms == 0 {
            anyhow::bail!("scheduler.interval_ms must be greater than 0");
        }

        if self.scheduler.batch_size == 0 {
            anyhow::bail!("scheduler.batch_size must be greater than 0");
        }

        if self.worker.interval_ms == 0 {
            anyhow::bail!("worker.interval_ms must be greater than 0");
        }

        if self.worker.max_concurrent_tasks == 0 {
            anyhow::bail!("worker.max_concurrent_tasks must be greater than 0");
        }

        if self.worker.request_timeout_secs == 0 {
            anyhow::bail!("worker.request_timeout_secs must be greater than 0");
        }

        if self.lifecycle.interval_secs == 0 {
            anyhow::bail!("lifecycle.interval_secs must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!(
                "logging.format must be 'text' or 'json', got '{}'",
                self.logging.format
            );
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.worker.request_timeout_secs)
    }

    #[must_use]
    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler.interval_ms)
    }

    #[must_use]
    pub fn worker_interval(&self) -> Duration {
        Duration::from_millis(self.worker.interval_ms)
    }

    #[must_use]
    pub fn lifecycle_interval(&self) -> Duration {
        Duration::from_secs(self.lifecycle.interval_secs)
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.database.busy_timeout_ms)
    }
}
