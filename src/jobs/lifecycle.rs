//! Job completion
//!
//! The leader periodically closes RUNNING jobs whose page budget is met. With
//! `complete_on_exhausted_frontier` it also closes jobs that have nothing
//! left to crawl; otherwise such a job stays RUNNING.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::LifecycleConfig;
use crate::coordinator::NodeRegistry;
use crate::error::Error;
use crate::metrics;
use crate::models::{Job, JobStatus, ProgressEvent, TaskCounts};
use crate::notifications::ProgressNotifier;
use crate::storage::{CrawlStore, StoreResult};

/// What one lifecycle cycle did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleReport {
    pub leader: bool,
    pub running: usize,
    pub completed: usize,
}

/// Leader-only job completion loop
pub struct JobLifecycleManager {
    store: Arc<dyn CrawlStore>,
    registry: Arc<NodeRegistry>,
    notifier: Arc<dyn ProgressNotifier>,
    config: LifecycleConfig,
}

impl JobLifecycleManager {
    pub fn new(
        store: Arc<dyn CrawlStore>,
        registry: Arc<NodeRegistry>,
        notifier: Arc<dyn ProgressNotifier>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            store,
            registry,
            notifier,
            config,
        }
    }

    fn is_done(&self, job: &Job, counts: &TaskCounts) -> bool {
        job.budget_met(counts.completed)
            || (self.config.complete_on_exhausted_frontier && counts.outstanding() == 0)
    }

    /// Complete every RUNNING job that is done; a no-op unless leader
    pub fn run_cycle(&self) -> StoreResult<LifecycleReport> {
        if !self.registry.is_leader()? {
            return Ok(LifecycleReport::default());
        }

        let running = self.store.list_jobs_by_status(JobStatus::Running)?;
        let mut report = LifecycleReport {
            leader: true,
            running: running.len(),
            completed: 0,
        };

        for mut job in running {
            let counts = self.store.task_counts(job.id)?;
            if !self.is_done(&job, &counts) {
                continue;
            }

            let now = Utc::now();
            if !self
                .store
                .transition_job(job.id, JobStatus::Running, JobStatus::Completed, now)?
            {
                continue;
            }
            job.transition(JobStatus::Completed, now)?;

            report.completed += 1;
            metrics::record_job_completed();
            tracing::info!(
                job_id = %job.id,
                seed_url = %job.seed_url,
                completed = counts.completed,
                failed = counts.failed,
                "Crawl completed"
            );
            self.notifier.notify(&ProgressEvent::new(
                &job,
                counts.completed,
                0,
                "Crawl completed",
            ));
        }

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
                            Error::from(e).report("Lifecycle cycle");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Lifecycle manager shutting down");
                        break;
                    }
                }
            }
        })
    }
}
