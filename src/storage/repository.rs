//! Repository abstraction over the shared store
//!
//! The orchestration loops only talk to [`CrawlStore`], so the backing
//! technology can be swapped without touching scheduling logic.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  registry / election / scheduler / worker / lifecycle     │
//! └───────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                      CrawlStore trait                     │
//! │    jobs · tasks · results · nodes · conditional updates   │
//! └───────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                   ┌─────────────────────┐
//!                   │  SqliteCrawlStore   │
//!                   └─────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::StoreResult;
use crate::models::{CrawlResult, Job, JobStatus, Node, Task, TaskCounts, TaskStatus};

/// Outcome of a budget-checked child insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildInsert {
    /// New pending task created
    Inserted,
    /// The job already has a task for this URL
    Duplicate,
    /// The job's task count reached its page budget
    BudgetExhausted,
}

/// Outcome of a conditional task assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// The task was no longer pending (another leader took it)
    Taken,
    /// The task now belongs to the node; `job_started` is set when the same
    /// transaction moved its job from PENDING to RUNNING
    Assigned { job_started: bool },
}

impl Assignment {
    pub fn is_assigned(self) -> bool {
        matches!(self, Self::Assigned { .. })
    }
}

/// Store operations used by the orchestration engine
pub trait CrawlStore: Send + Sync {
    // ------------------------------------------------------------------
    // Jobs
    // ------------------------------------------------------------------

    /// Persist a new job together with its seed task, atomically
    fn create_job(&self, job: &Job, seed: &Task) -> StoreResult<()>;

    fn get_job(&self, id: Uuid) -> StoreResult<Option<Job>>;

    /// Jobs of one owner, newest first
    fn list_jobs_by_owner(&self, owner: &str) -> StoreResult<Vec<Job>>;

    fn list_jobs_by_status(&self, status: JobStatus) -> StoreResult<Vec<Job>>;

    /// All jobs, newest first
    fn list_jobs(&self) -> StoreResult<Vec<Job>>;

    /// Move a job from `from` to `to` if it is still in `from`.
    ///
    /// Returns `false` when another node got there first. Illegal moves are
    /// rejected before touching the store.
    fn transition_job(&self, id: Uuid, from: JobStatus, to: JobStatus, at: DateTime<Utc>) -> StoreResult<bool>;

    /// Delete a job; its tasks and results go with it
    fn delete_job(&self, id: Uuid) -> StoreResult<bool>;

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Insert a task, ignoring a `(job, url)` conflict (returns `false`)
    fn insert_task(&self, task: &Task) -> StoreResult<bool>;

    /// Insert a child task only while the job holds fewer than `max_pages` tasks
    fn insert_child_task(&self, task: &Task, max_pages: u32) -> StoreResult<ChildInsert>;

    fn task_exists(&self, job_id: Uuid, url: &str) -> StoreResult<bool>;

    /// Count tasks of a job, optionally restricted to one status
    fn count_tasks(&self, job_id: Uuid, status: Option<TaskStatus>) -> StoreResult<u64>;

    /// Counts of every status for a job
    fn task_counts(&self, job_id: Uuid) -> StoreResult<TaskCounts>;

    /// Up to `limit` tasks in `status`, oldest first
    fn list_tasks_by_status(&self, status: TaskStatus, limit: usize) -> StoreResult<Vec<Task>>;

    fn list_tasks_for_node(&self, node_id: Uuid, status: TaskStatus) -> StoreResult<Vec<Task>>;

    fn list_tasks_for_job(&self, job_id: Uuid) -> StoreResult<Vec<Task>>;

    /// `Pending -> Assigned` if the task is still pending.
    ///
    /// A PENDING job of the task becomes RUNNING in the same transaction, so a
    /// job can never be left PENDING with its seed already handed out.
    fn assign_task(&self, task_id: Uuid, node_id: Uuid, at: DateTime<Utc>) -> StoreResult<Assignment>;

    /// `Assigned -> outcome` if the task is still assigned to `node_id`.
    ///
    /// The result, when given, is written in the same transaction and only if
    /// the transition happened, so a finished task never gains a second result.
    fn finish_task(
        &self,
        task_id: Uuid,
        node_id: Uuid,
        outcome: TaskStatus,
        result: Option<&CrawlResult>,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Return ASSIGNED tasks whose node is not ACTIVE (offline or deleted)
    /// to PENDING; returns how many moved
    fn reclaim_orphaned_tasks(&self) -> StoreResult<usize>;

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    /// Results of a job in crawl order
    fn list_results(&self, job_id: Uuid) -> StoreResult<Vec<CrawlResult>>;

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Insert or refresh a node row; the leader flag of an existing row is kept
    fn upsert_node(&self, node: &Node) -> StoreResult<()>;

    fn get_node(&self, id: Uuid) -> StoreResult<Option<Node>>;

    /// Refresh heartbeat and mark ACTIVE; `false` if the row is gone
    fn touch_node(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool>;

    /// The node currently flagged as leader, freshest heartbeat first
    fn find_leader(&self) -> StoreResult<Option<Node>>;

    /// ACTIVE nodes with a heartbeat after `threshold`, oldest heartbeat first,
    /// ties broken by id
    fn list_live_nodes(&self, threshold: DateTime<Utc>) -> StoreResult<Vec<Node>>;

    fn list_nodes(&self) -> StoreResult<Vec<Node>>;

    /// Bulk `ACTIVE -> OFFLINE` (and leader flag cleared) for heartbeats older
    /// than `threshold`
    fn mark_stale_nodes_offline(&self, threshold: DateTime<Utc>) -> StoreResult<usize>;

    /// Clear the leader flag if the node still shows `observed_heartbeat`
    fn demote_leader(&self, node_id: Uuid, observed_heartbeat: DateTime<Utc>) -> StoreResult<bool>;

    /// Compare-and-swap promotion: set the flag on `node_id` only when no
    /// ACTIVE node with a heartbeat after `threshold` holds it already
    fn try_acquire_leadership(&self, node_id: Uuid, threshold: DateTime<Utc>) -> StoreResult<bool>;

    /// Administrative reset of the node table
    fn delete_all_nodes(&self) -> StoreResult<usize>;
}
