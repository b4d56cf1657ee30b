//! Heartbeat-based leader election
//!
//! Any node may run a round. The leader is whichever ACTIVE node has the
//! oldest fresh heartbeat, so the longest-running member tends to keep the
//! role. Promotion is a compare-and-swap in the store: two nodes running a
//! round at the same time cannot both set the flag while the other's is fresh.
//!
//! This is not consensus. A window with zero leaders (between a leader dying
//! and the next round) or, with clock skew between hosts, two leaders, is
//! possible and tolerated by the rest of the system.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::metrics;
use crate::storage::{CrawlStore, StoreResult};

/// What a single election round observed or did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionOutcome {
    /// A leader with a fresh heartbeat exists; nothing changed
    LeaderHealthy { leader: Uuid },

    /// This round promoted `leader` (not necessarily the caller)
    Elected { leader: Uuid },

    /// Another round promoted someone between our read and our update
    Contended,

    /// No ACTIVE node has a fresh heartbeat
    NoCandidates,
}

impl ElectionOutcome {
    /// Leader known after the round, if any
    pub fn leader(&self) -> Option<Uuid> {
        match self {
            Self::LeaderHealthy { leader } | Self::Elected { leader } => Some(*leader),
            Self::Contended | Self::NoCandidates => None,
        }
    }
}

/// Run one election round as seen from `node_id` at `now`
pub fn run_election(
    store: &dyn CrawlStore,
    node_id: Uuid,
    timeout: Duration,
    now: DateTime<Utc>,
) -> StoreResult<ElectionOutcome> {
    let threshold = now - timeout;

    if let Some(leader) = store.find_leader()? {
        if leader.is_live(now, timeout) {
            return Ok(ElectionOutcome::LeaderHealthy { leader: leader.id });
        }

        // conditional on the heartbeat we saw, so a leader that just
        // refreshed keeps its flag
        if store.demote_leader(leader.id, leader.last_heartbeat)? {
            tracing::warn!(
                leader = %leader.label,
                last_heartbeat = %leader.last_heartbeat,
                "Demoted stale leader"
            );
        }
    }

    let candidates = store.list_live_nodes(threshold)?;
    let Some(candidate) = candidates.first() else {
        tracing::debug!(node_id = %node_id, "No live nodes to elect");
        return Ok(ElectionOutcome::NoCandidates);
    };

    if store.try_acquire_leadership(candidate.id, threshold)? {
        tracing::info!(
            leader = %candidate.label,
            elected_by = %node_id,
            "New leader elected"
        );
        if candidate.id == node_id {
            metrics::record_election_won();
        }
        Ok(ElectionOutcome::Elected {
            leader: candidate.id,
        })
    } else {
        tracing::debug!(node_id = %node_id, "Leadership taken by a concurrent round");
        Ok(ElectionOutcome::Contended)
    }
}
