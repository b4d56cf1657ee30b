//! Failover for work held by dead nodes
//!
//! A node that stops heartbeating is swept to OFFLINE, but the tasks it had
//! been assigned stay ASSIGNED to it. The same happens when node rows are
//! deleted outright (`reset-nodes`). Reclaiming moves such tasks back to
//! PENDING so the next scheduling cycle hands them to a live node.

use crate::metrics;
use crate::storage::{CrawlStore, StoreResult};

/// Return every task whose node is OFFLINE or gone to PENDING
///
/// Tasks of nodes that are merely late (still ACTIVE) are left alone. If the
/// original node comes back and finishes the task anyway, its terminal
/// update no longer matches and is dropped.
pub fn reclaim_orphans(store: &dyn CrawlStore) -> StoreResult<usize> {
    let reclaimed = store.reclaim_orphaned_tasks()?;
    if reclaimed > 0 {
        tracing::warn!(count = reclaimed, "Reclaimed tasks from offline or removed nodes");
        metrics::record_tasks_reclaimed(reclaimed);
    }
    Ok(reclaimed)
}
