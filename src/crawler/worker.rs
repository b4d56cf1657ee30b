//! Crawl worker
//!
//! Every node runs a worker loop that processes the tasks the leader assigned
//! to it. A task ends COMPLETED when the page answered below 400 (or the job's
//! page budget was already met), FAILED otherwise. The terminal write is
//! conditional on the task still being assigned to this node.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

use crate::crawler::fetcher::PageFetcher;
use crate::error::Error;
use crate::metrics;
use crate::models::{CrawlResult, Job, ProgressEvent, Task, TaskStatus};
use crate::notifications::ProgressNotifier;
use crate::parser::parse_page;
use crate::storage::{ChildInsert, CrawlStore, StoreResult};

/// What happened to one task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOutcome {
    /// Page fetched with status < 400
    Completed { children: usize },
    /// HTTP error status or transport failure
    Failed,
    /// Job budget already met; completed without fetching
    Skipped,
    /// Task was reclaimed or its job deleted before the terminal write
    Lost,
}

/// Totals for one worker cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub lost: usize,
    pub children: usize,
    /// Tasks whose processing hit a store error; retried next cycle
    pub errors: usize,
}

impl WorkerReport {
    fn record(&mut self, outcome: &StoreResult<TaskOutcome>) {
        match outcome {
            Ok(TaskOutcome::Completed { children }) => {
                self.completed += 1;
                self.children += children;
            }
            Ok(TaskOutcome::Failed) => self.failed += 1,
            Ok(TaskOutcome::Skipped) => self.skipped += 1,
            Ok(TaskOutcome::Lost) => self.lost += 1,
            Err(_) => self.errors += 1,
        }
    }
}

/// Processes tasks assigned to one node
pub struct CrawlWorker {
    store: Arc<dyn CrawlStore>,
    fetcher: Arc<dyn PageFetcher>,
    notifier: Arc<dyn ProgressNotifier>,
    node_id: Uuid,
    max_concurrent: usize,
}

impl CrawlWorker {
    pub fn new(
        store: Arc<dyn CrawlStore>,
        fetcher: Arc<dyn PageFetcher>,
        notifier: Arc<dyn ProgressNotifier>,
        node_id: Uuid,
        max_concurrent: usize,
    ) -> Self {
        Self {
            store,
            fetcher,
            notifier,
            node_id,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn node_id(&self) -> Uuid {
        self.node_id
    }

    /// Process every task currently assigned to this node
    pub async fn run_cycle(&self) -> StoreResult<WorkerReport> {
        let tasks = self
            .store
            .list_tasks_for_node(self.node_id, TaskStatus::Assigned)?;

        let mut report = WorkerReport {
            claimed: tasks.len(),
            ..WorkerReport::default()
        };
        if tasks.is_empty() {
            return Ok(report);
        }

        let outcomes: Vec<(Uuid, StoreResult<TaskOutcome>)> = stream::iter(tasks)
            .map(|task| async move {
                let id = task.id;
                (id, self.process_task(task).await)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        for (task_id, outcome) in &outcomes {
            if let Err(e) = outcome {
                tracing::warn!(task_id = %task_id, error = %e, "Task processing failed, will retry");
            }
            report.record(outcome);
        }

        tracing::debug!(
            node_id = %self.node_id,
            completed = report.completed,
            failed = report.failed,
            skipped = report.skipped,
            children = report.children,
            "Worker cycle finished"
        );
        Ok(report)
    }

    /// Run one assigned task to a terminal state
    pub async fn process_task(&self, task: Task) -> StoreResult<TaskOutcome> {
        let Some(job) = self.store.get_job(task.job_id)? else {
            tracing::debug!(task_id = %task.id, job_id = %task.job_id, "Job gone, dropping task");
            return Ok(TaskOutcome::Lost);
        };

        let completed = self.store.count_tasks(job.id, Some(TaskStatus::Completed))?;
        if job.budget_met(completed) {
            let done = self
                .store
                .finish_task(task.id, self.node_id, TaskStatus::Completed, None, Utc::now())?;
            if !done {
                return Ok(TaskOutcome::Lost);
            }
            metrics::record_page("skipped");
            tracing::debug!(task_id = %task.id, url = %task.url, "Page budget met, skipped fetch");
            return Ok(TaskOutcome::Skipped);
        }

        let (result, children) = match self.fetcher.fetch(&task.url).await {
            Ok(page) => {
                let parsed = parse_page(&page.body, &page.final_url);
                let result =
                    CrawlResult::fetched(&task, page.status, parsed.title.clone(), parsed.link_count());

                let children = if page.status < 400 && job.can_expand(task.depth) {
                    self.expand_frontier(&job, &task, &parsed.candidates())?
                } else {
                    0
                };
                (result, children)
            }
            Err(e) => {
                tracing::warn!(task_id = %task.id, url = %task.url, error = %e, "Failed to crawl");
                metrics::record_page("error");
                (CrawlResult::failed(&task, e.to_string()), 0)
            }
        };

        let outcome = if result.is_error() {
            TaskStatus::Failed
        } else {
            TaskStatus::Completed
        };

        let finished = self
            .store
            .finish_task(task.id, self.node_id, outcome, Some(&result), Utc::now())?;
        if !finished {
            tracing::info!(task_id = %task.id, url = %task.url, "Task no longer ours, result discarded");
            return Ok(TaskOutcome::Lost);
        }

        if result.status_code != 0 {
            metrics::record_page(if outcome == TaskStatus::Completed {
                "completed"
            } else {
                "failed"
            });
        }
        tracing::info!(
            task_id = %task.id,
            job_id = %job.id,
            url = %task.url,
            status = result.status_code,
            depth = task.depth,
            children,
            "Processed page"
        );
        self.publish(&job, format!("Processed {}", task.url));

        Ok(match outcome {
            TaskStatus::Completed => TaskOutcome::Completed { children },
            _ => TaskOutcome::Failed,
        })
    }

    /// Insert children until the job's task budget is exhausted
    fn expand_frontier(&self, job: &Job, parent: &Task, urls: &[String]) -> StoreResult<usize> {
        let mut created = 0;
        for url in urls {
            if self.store.task_exists(job.id, url)? {
                continue;
            }
            match self.store.insert_child_task(&Task::child_of(parent, url.as_str()), job.max_pages)? {
                ChildInsert::Inserted => created += 1,
                ChildInsert::Duplicate => {}
                ChildInsert::BudgetExhausted => break,
            }
        }

        if created > 0 {
            metrics::record_children_created(created);
            tracing::debug!(job_id = %job.id, parent = %parent.url, created, "Expanded frontier");
        }
        Ok(created)
    }

    fn publish(&self, job: &Job, message: String) {
        // Counts are informational; a failed read must not fail the task
        let (processed, pending) = match self.store.task_counts(job.id) {
            Ok(counts) => (counts.completed, counts.outstanding()),
            Err(e) => {
                tracing::debug!(job_id = %job.id, error = %e, "Could not read task counts");
                (0, 0)
            }
        };
        let job = self
            .store
            .get_job(job.id)
            .ok()
            .flatten()
            .unwrap_or_else(|| job.clone());
        self.notifier
            .notify(&ProgressEvent::new(&job, processed, pending, message));
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
                        if let Err(e) = self.run_cycle().await {
                            Error::from(e).report("Worker cycle");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!(node_id = %self.node_id, "Worker shutting down");
                        break;
                    }
                }
            }
        })
    }
}
