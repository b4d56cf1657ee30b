//! Leader-only task scheduling
//!
//! Every node runs the scheduling loop, but a cycle does nothing unless the
//! local node holds the leader flag at that moment.
//!
//! # Cycle
//!
//! ```text
//! is_leader? ──no──▶ idle
//!     │
//!     ▼
//! reclaim tasks of OFFLINE or removed nodes (optional)
//!     │
//!     ▼
//! up to batch_size PENDING tasks ──▶ live nodes (oldest heartbeat first)
//!     │
//!     ▼
//! round_robin plan ──▶ per task, one transaction:
//!                        PENDING→ASSIGNED, and its job PENDING→RUNNING
//! ```
//!
//! Two leaders running a cycle at once cannot double-assign a task: the
//! update only succeeds while the task is still PENDING.

pub mod assignment;
pub mod failover;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::SchedulerConfig;
use crate::coordinator::NodeRegistry;
use crate::error::Error;
use crate::metrics;
use crate::models::TaskStatus;
use crate::storage::{Assignment, CrawlStore, StoreResult};

pub use assignment::round_robin;
pub use failover::reclaim_orphans;

/// What one scheduling cycle did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingReport {
    /// Whether this node was leader for the cycle
    pub leader: bool,
    pub reclaimed: usize,
    pub live_nodes: usize,
    pub assigned: usize,
    /// Planned tasks another leader took first
    pub skipped: usize,
    pub jobs_started: usize,
}

/// Assigns PENDING tasks to live nodes
pub struct TaskScheduler {
    store: Arc<dyn CrawlStore>,
    registry: Arc<NodeRegistry>,
    config: SchedulerConfig,
}

impl TaskScheduler {
    pub fn new(store: Arc<dyn CrawlStore>, registry: Arc<NodeRegistry>, config: SchedulerConfig) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    /// Run one cycle; a no-op unless the local node is leader
    pub fn run_cycle(&self) -> StoreResult<SchedulingReport> {
        if !self.registry.is_leader()? {
            return Ok(SchedulingReport::default());
        }

        let mut report = SchedulingReport {
            leader: true,
            ..SchedulingReport::default()
        };

        if self.config.reclaim_orphans {
            report.reclaimed = reclaim_orphans(self.store.as_ref())?;
        }

        let pending = self
            .store
            .list_tasks_by_status(TaskStatus::Pending, self.config.batch_size)?;
        if pending.is_empty() {
            return Ok(report);
        }

        let now = Utc::now();
        let nodes = self.store.list_live_nodes(now - self.registry.timeout())?;
        report.live_nodes = nodes.len();
        metrics::set_live_nodes(nodes.len());
        if nodes.is_empty() {
            tracing::debug!(pending = pending.len(), "No live nodes, skipping assignment");
            return Ok(report);
        }

        for (task, node) in round_robin(&pending, &nodes) {
            match self.store.assign_task(task.id, node.id, now)? {
                Assignment::Taken => report.skipped += 1,
                Assignment::Assigned { job_started } => {
                    report.assigned += 1;
                    tracing::debug!(task_id = %task.id, node = %node.label, url = %task.url, "Task assigned");
                    if job_started {
                        report.jobs_started += 1;
                        tracing::info!(job_id = %task.job_id, "Job started");
                    }
                }
            }
        }

        metrics::record_tasks_assigned(report.assigned);
        tracing::info!(
            assigned = report.assigned,
            skipped = report.skipped,
            nodes = report.live_nodes,
            "Assigned pending tasks"
        );
        Ok(report)
    }

    /// Start background task that runs a cycle every `every`
    pub fn start(
        self: Arc<Self>,
        every: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_cycle() {
                            Error::from(e).report("Scheduling cycle");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Scheduler shutting down");
                        break;
                    }
                }
            }
        })
    }
}
