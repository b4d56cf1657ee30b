//! Job submission and queries

use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::crawler::url::normalize_url;
use crate::models::{CrawlRequest, CrawlResult, Job, JobSummary, ProgressEvent, Task, ValidationError};
use crate::notifications::ProgressNotifier;
use crate::storage::{CrawlStore, StoreError, StoreResult};

/// Submission failures
#[derive(Error, Debug)]
pub enum SubmissionError {
    /// Request rejected before anything was persisted
    #[error("Invalid value for '{field}': {reason}")]
    InvalidRequest { field: &'static str, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SubmissionError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidRequest { .. } => false,
            Self::Store(e) => e.is_recoverable(),
        }
    }
}

impl From<ValidationError> for SubmissionError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidRequest {
            field: err.field,
            reason: err.reason,
        }
    }
}

/// Entry point for creating and inspecting crawl jobs
pub struct JobService {
    store: Arc<dyn CrawlStore>,
    notifier: Arc<dyn ProgressNotifier>,
}

impl JobService {
    pub fn new(store: Arc<dyn CrawlStore>, notifier: Arc<dyn ProgressNotifier>) -> Self {
        Self { store, notifier }
    }

    /// Validate `request` and queue a job with its depth-0 seed task
    ///
    /// # Errors
    ///
    /// `InvalidRequest` when a budget is out of range or the URL is not an
    /// absolute http(s) URL; nothing is written in that case.
    pub fn submit(&self, request: CrawlRequest) -> Result<Job, SubmissionError> {
        request.validate()?;

        let seed_url = normalize_url(&request.url).map_err(|e| SubmissionError::InvalidRequest {
            field: "url",
            reason: e.to_string(),
        })?;

        let job = Job::new(seed_url, request.max_depth, request.max_pages, request.owner);
        let seed = Task::seed(&job);
        self.store.create_job(&job, &seed)?;

        tracing::info!(
            job_id = %job.id,
            seed_url = %job.seed_url,
            max_depth = job.max_depth,
            max_pages = job.max_pages,
            owner = %job.owner,
            "Crawl job queued"
        );
        self.notifier
            .notify(&ProgressEvent::new(&job, 0, 0, "Crawl job queued"));

        Ok(job)
    }

    pub fn get(&self, id: Uuid) -> StoreResult<Option<Job>> {
        self.store.get_job(id)
    }

    /// Job by id, only if it belongs to `owner`
    pub fn get_for_owner(&self, id: Uuid, owner: &str) -> StoreResult<Option<Job>> {
        Ok(self.store.get_job(id)?.filter(|job| job.owner == owner))
    }

    /// Jobs of `owner`, newest first
    pub fn list_for_owner(&self, owner: &str) -> StoreResult<Vec<Job>> {
        self.store.list_jobs_by_owner(owner)
    }

    /// Every job, newest first
    pub fn list(&self) -> StoreResult<Vec<Job>> {
        self.store.list_jobs()
    }

    /// Results of a job in crawl order
    pub fn results(&self, id: Uuid) -> StoreResult<Vec<CrawlResult>> {
        self.store.list_results(id)
    }

    pub fn summary(&self, id: Uuid) -> StoreResult<Option<JobSummary>> {
        let Some(job) = self.store.get_job(id)? else {
            return Ok(None);
        };
        let counts = self.store.task_counts(id)?;
        Ok(Some(JobSummary { job, counts }))
    }

    /// Summaries for all jobs, or only those of `owner`
    pub fn summaries(&self, owner: Option<&str>) -> StoreResult<Vec<JobSummary>> {
        let jobs = match owner {
            Some(owner) => self.store.list_jobs_by_owner(owner)?,
            None => self.store.list_jobs()?,
        };
        jobs.into_iter()
            .map(|job| {
                let counts = self.store.task_counts(job.id)?;
                Ok(JobSummary { job, counts })
            })
            .collect()
    }

    /// Remove a job with its tasks and results
    pub fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let deleted = self.store.delete_job(id)?;
        if deleted {
            tracing::info!(job_id = %id, "Crawl job deleted");
        }
        Ok(deleted)
    }
}
