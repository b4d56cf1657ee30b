// Core data structures for the fleetcrawl orchestration engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Upper bound accepted for `CrawlRequest::max_depth`
pub const MAX_DEPTH_LIMIT: u32 = 5;

/// Upper bound accepted for `CrawlRequest::max_pages`
pub const MAX_PAGES_LIMIT: u32 = 500;

// ============================================================================
// Status enums
// ============================================================================

/// Error returned when a status column holds an unknown value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind} status: {value}")]
pub struct StatusParseError {
    pub kind: &'static str,
    pub value: String,
}

/// Rejected state machine move
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Illegal {entity} transition: {from} -> {to}")]
pub struct TransitionError {
    pub entity: &'static str,
    pub from: String,
    pub to: String,
}

/// Lifecycle of a crawl job
///
/// Moves strictly forward: `Pending -> Running -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
        }
    }

    /// Whether `self -> next` is a legal move
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running) | (Self::Running, Self::Completed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Lifecycle of a single page task
///
/// `Completed` and `Failed` are terminal. `Assigned -> Pending` is only used
/// when reclaiming work from a node that went offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Assigned,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Assigned => "ASSIGNED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Whether `self -> next` is a legal move
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Assigned)
                | (Self::Assigned, Self::Completed)
                | (Self::Assigned, Self::Failed)
                | (Self::Assigned, Self::Pending)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Liveness of a crawler node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    Active,
    Offline,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Offline => "OFFLINE",
        }
    }
}

macro_rules! impl_status_text {
    ($ty:ty, $kind:literal, [$($variant:ident),+]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = StatusParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case(<$ty>::$variant.as_str()) {
                        return Ok(<$ty>::$variant);
                    }
                )+
                Err(StatusParseError {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }
    };
}

impl_status_text!(JobStatus, "job", [Pending, Running, Completed]);
impl_status_text!(TaskStatus, "task", [Pending, Assigned, Completed, Failed]);
impl_status_text!(NodeStatus, "node", [Active, Offline]);

// ============================================================================
// Crawl Request
// ============================================================================

/// Invalid submission field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid value for '{field}': {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

/// Job submission input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub url: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Opaque principal reference, never interpreted by the core
    #[serde(default)]
    pub owner: String,
}

fn default_max_depth() -> u32 {
    2
}

fn default_max_pages() -> u32 {
    50
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            owner: owner.into(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Check budgets and seed URL before anything is persisted
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError {
                field: "url",
                reason: "must not be blank".to_string(),
            });
        }

        if !(1..=MAX_DEPTH_LIMIT).contains(&self.max_depth) {
            return Err(ValidationError {
                field: "max_depth",
                reason: format!("must be between 1 and {MAX_DEPTH_LIMIT}, got {}", self.max_depth),
            });
        }

        if !(1..=MAX_PAGES_LIMIT).contains(&self.max_pages) {
            return Err(ValidationError {
                field: "max_pages",
                reason: format!("must be between 1 and {MAX_PAGES_LIMIT}, got {}", self.max_pages),
            });
        }

        match url::Url::parse(self.url.trim()) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
            Ok(parsed) => Err(ValidationError {
                field: "url",
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            }),
            Err(e) => Err(ValidationError {
                field: "url",
                reason: e.to_string(),
            }),
        }
    }
}

// ============================================================================
// Job
// ============================================================================

/// A crawl job rooted at one seed URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub seed_url: String,
    pub max_depth: u32,
    pub max_pages: u32,
    pub status: JobStatus,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a pending job; `seed_url` is expected to be normalized already
    pub fn new(seed_url: impl Into<String>, max_depth: u32, max_pages: u32, owner: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            seed_url: seed_url.into(),
            max_depth,
            max_pages,
            status: JobStatus::Pending,
            owner: owner.into(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Move to `next`, stamping the matching timestamp
    pub fn transition(&mut self, next: JobStatus, at: DateTime<Utc>) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                entity: "job",
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }

        match next {
            JobStatus::Running => self.started_at = Some(at),
            JobStatus::Completed => self.completed_at = Some(at),
            JobStatus::Pending => {}
        }
        self.status = next;
        Ok(())
    }

    /// Whether pages at `depth` may spawn children
    pub fn can_expand(&self, depth: u32) -> bool {
        depth < self.max_depth
    }

    /// Whether `completed` pages satisfy the page budget
    pub fn budget_met(&self, completed: u64) -> bool {
        completed >= u64::from(self.max_pages)
    }
}

// ============================================================================
// Task
// ============================================================================

/// One URL to fetch on behalf of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub job_id: Uuid,
    pub url: String,
    pub depth: u32,
    pub status: TaskStatus,
    pub assigned_node: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    fn new(job_id: Uuid, url: String, depth: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            url,
            depth,
            status: TaskStatus::Pending,
            assigned_node: None,
            created_at: Utc::now(),
            assigned_at: None,
            completed_at: None,
        }
    }

    /// The depth-0 task created with every job
    pub fn seed(job: &Job) -> Self {
        Self::new(job.id, job.seed_url.clone(), 0)
    }

    /// A task discovered on the page of `parent`
    pub fn child_of(parent: &Task, url: impl Into<String>) -> Self {
        Self::new(parent.job_id, url.into(), parent.depth + 1)
    }
}

// ============================================================================
// Node
// ============================================================================

/// A crawler process registered in the shared store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: Uuid,
    /// Human-readable label, `<hostname>-<id>`
    pub label: String,
    pub hostname: String,
    pub last_heartbeat: DateTime<Utc>,
    pub status: NodeStatus,
    pub is_leader: bool,
}

impl Node {
    pub fn new(id: Uuid, hostname: impl Into<String>) -> Self {
        let hostname = hostname.into();
        Self {
            id,
            label: format!("{hostname}-{id}"),
            hostname,
            last_heartbeat: Utc::now(),
            status: NodeStatus::Active,
            is_leader: false,
        }
    }

    /// Heartbeat is within `timeout` of `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
        self.last_heartbeat > now - timeout
    }

    /// Active and fresh
    pub fn is_live(&self, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
        self.status == NodeStatus::Active && self.is_fresh(now, timeout)
    }
}

// ============================================================================
// Result
// ============================================================================

/// Outcome of processing one task; append-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub id: Uuid,
    pub job_id: Uuid,
    pub task_id: Uuid,
    pub url: String,
    /// HTTP status, `0` for transport-level failures
    pub status_code: u16,
    pub title: Option<String>,
    pub link_count: u32,
    pub error_message: Option<String>,
    pub crawled_at: DateTime<Utc>,
}

impl CrawlResult {
    /// Result of a page that answered; codes >= 400 carry `HTTP <code>`
    pub fn fetched(task: &Task, status_code: u16, title: Option<String>, link_count: u32) -> Self {
        let error_message = (status_code >= 400).then(|| format!("HTTP {status_code}"));
        Self {
            id: Uuid::new_v4(),
            job_id: task.job_id,
            task_id: task.id,
            url: task.url.clone(),
            status_code,
            title,
            link_count,
            error_message,
            crawled_at: Utc::now(),
        }
    }

    /// Result of a transport or parse failure
    pub fn failed(task: &Task, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id: task.job_id,
            task_id: task.id,
            url: task.url.clone(),
            status_code: 0,
            title: None,
            link_count: 0,
            error_message: Some(message.into()),
            crawled_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status_code == 0 || self.status_code >= 400
    }
}

// ============================================================================
// Progress and summaries
// ============================================================================

/// Event pushed to observers whenever a task finishes or a job completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: Uuid,
    pub seed_url: String,
    pub status: JobStatus,
    /// COMPLETED tasks of the job; failed pages are not counted
    pub processed: u64,
    /// Tasks still PENDING or ASSIGNED
    pub pending: u64,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(job: &Job, processed: u64, pending: u64, message: impl Into<String>) -> Self {
        Self {
            job_id: job.id,
            seed_url: job.seed_url.clone(),
            status: job.status,
            processed,
            pending,
            message: message.into(),
        }
    }
}

/// Task counts of a job by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub pending: u64,
    pub assigned: u64,
    pub completed: u64,
    pub failed: u64,
}

impl TaskCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.assigned + self.completed + self.failed
    }

    /// Tasks that still need a worker
    pub fn outstanding(&self) -> u64 {
        self.pending + self.assigned
    }

    /// Tasks that reached a terminal state
    pub fn processed(&self) -> u64 {
        self.completed + self.failed
    }

    pub fn add(&mut self, status: TaskStatus, count: u64) {
        match status {
            TaskStatus::Pending => self.pending += count,
            TaskStatus::Assigned => self.assigned += count,
            TaskStatus::Completed => self.completed += count,
            TaskStatus::Failed => self.failed += count,
        }
    }
}

/// A job together with its task counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job: Job,
    pub counts: TaskCounts,
}

impl JobSummary {
    /// Format as a single display line
    pub fn display(&self) -> String {
        format!(
            "{} {:<9} depth<={} pages<={} done={} failed={} outstanding={} {}",
            self.job.id,
            self.job.status.as_str(),
            self.job.max_depth,
            self.job.max_pages,
            self.counts.completed,
            self.counts.failed,
            self.counts.outstanding(),
            self.job.seed_url
        )
    }
}
