//! fleetcrawl - leader-elected fleet of cooperating crawler nodes
//!
//! Any number of identical processes share one durable store. Each process
//! registers a node, heartbeats, and takes part in leader election. The leader
//! assigns pending crawl tasks round-robin to live nodes and closes jobs whose
//! page budget is met; every node fetches and parses the pages assigned to it
//! and feeds newly discovered links back into the job's frontier.
//!
//! # Architecture
//!
//! - [`config`] - Configuration sections, TOML and environment loading
//! - [`coordinator`] - Node heartbeat, sweep and leader election
//! - [`scheduler`] - Leader-only round-robin task assignment and orphan reclaim
//! - [`crawler`] - Fetching, URL handling, the worker loop and node runner
//! - [`parser`] - HTML title and link extraction
//! - [`jobs`] - Job submission and completion
//! - [`notifications`] - Progress event fan-out
//! - [`storage`] - The shared store (SQLite)
//! - [`metrics`] - Prometheus counters and gauges
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fleetcrawl::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = Arc::new(SqliteCrawlStore::new(
//!         &config.database.sqlite_path,
//!         config.busy_timeout(),
//!     )?);
//!     let notifier = Arc::new(LogNotifier);
//!
//!     let jobs = JobService::new(store.clone(), notifier.clone());
//!     jobs.submit(CrawlRequest::new("https://example.com/", "alice").with_max_pages(20))?;
//!
//!     let fetcher = Arc::new(HttpFetcher::new(&config.worker)?);
//!     let runner = DistributedRunner::new(config, store, fetcher, notifier);
//!     let handle = runner.start()?;
//!     tokio::signal::ctrl_c().await?;
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod crawler;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod notifications;
pub mod parser;
pub mod scheduler;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::coordinator::{ClusterConfig, NodeRegistry};
    pub use crate::crawler::{DistributedRunner, HttpFetcher, PageFetcher};
    pub use crate::error::{Error, ErrorCategory, FleetErrorTrait, Result};
    pub use crate::jobs::{JobLifecycleManager, JobService, SubmissionError};
    pub use crate::models::{CrawlRequest, CrawlResult, Job, JobStatus, Node, Task, TaskStatus};
    pub use crate::notifications::{BroadcastNotifier, LogNotifier, ProgressNotifier};
    pub use crate::scheduler::TaskScheduler;
    pub use crate::storage::{CrawlStore, SqliteCrawlStore};
}

// Direct re-exports for convenience
pub use models::{CrawlRequest, Job, JobStatus, TaskStatus};
