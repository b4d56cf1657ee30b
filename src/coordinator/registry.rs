//! Node registry for tracking fleet membership
//!
//! Each process owns exactly one node row. The registry writes that row,
//! refreshes its heartbeat, sweeps dead peers to OFFLINE and triggers an
//! election round after every heartbeat.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

use super::config::ClusterConfig;
use super::election::{run_election, ElectionOutcome};
use crate::error::Error;
use crate::metrics;
use crate::models::{Node, NodeStatus};
use crate::storage::{CrawlStore, StoreResult};

// ============================================================================
// Node Registry
// ============================================================================

/// Membership operations for the local node
pub struct NodeRegistry {
    store: Arc<dyn CrawlStore>,
    node_id: Uuid,
    hostname: String,
    timeout: Duration,
}

impl NodeRegistry {
    /// Create a registry for a fresh node identity
    pub fn new(store: Arc<dyn CrawlStore>, config: &ClusterConfig) -> Self {
        Self::with_node_id(store, config, Uuid::new_v4())
    }

    /// Create a registry for a known node identity
    pub fn with_node_id(store: Arc<dyn CrawlStore>, config: &ClusterConfig, node_id: Uuid) -> Self {
        Self {
            store,
            node_id,
            hostname: config.resolved_hostname(),
            timeout: config.heartbeat_timeout(),
        }
    }

    pub fn node_id(&self) -> Uuid {
        self.node_id
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Liveness window
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Insert the local node as ACTIVE, not leader, heartbeat now
    pub fn register(&self) -> StoreResult<Node> {
        let node = Node::new(self.node_id, self.hostname.clone());
        self.store.upsert_node(&node)?;
        tracing::info!(node_id = %self.node_id, label = %node.label, "Node registered");
        Ok(node)
    }

    /// Refresh the local heartbeat, re-creating the row if it vanished, then
    /// run an election round
    pub fn heartbeat(&self) -> StoreResult<ElectionOutcome> {
        self.heartbeat_at(Utc::now())
    }

    pub(crate) fn heartbeat_at(&self, now: DateTime<Utc>) -> StoreResult<ElectionOutcome> {
        if !self.store.touch_node(self.node_id, now)? {
            tracing::warn!(node_id = %self.node_id, "Node row missing, re-registering");
            let mut node = Node::new(self.node_id, self.hostname.clone());
            node.last_heartbeat = now;
            self.store.upsert_node(&node)?;
        }

        let outcome = run_election(self.store.as_ref(), self.node_id, self.timeout, now)?;
        if let Some(leader) = outcome.leader() {
            metrics::set_leader(leader == self.node_id);
        }
        Ok(outcome)
    }

    /// Mark every ACTIVE node with a stale heartbeat OFFLINE (and not leader)
    pub fn sweep(&self) -> StoreResult<usize> {
        self.sweep_at(Utc::now())
    }

    pub(crate) fn sweep_at(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let swept = self.store.mark_stale_nodes_offline(now - self.timeout)?;
        if swept > 0 {
            tracing::info!(count = swept, "Marked stale nodes offline");
            metrics::record_nodes_swept(swept);
        }
        Ok(swept)
    }

    /// Whether the local row currently carries the leader flag
    pub fn is_leader(&self) -> StoreResult<bool> {
        Ok(self
            .store
            .get_node(self.node_id)?
            .is_some_and(|node| node.is_leader))
    }

    /// All nodes with liveness counts
    pub fn cluster_overview(&self) -> StoreResult<ClusterStats> {
        let now = Utc::now();
        let nodes = self.store.list_nodes()?;

        let mut stats = ClusterStats {
            total_nodes: nodes.len(),
            ..ClusterStats::default()
        };
        for node in &nodes {
            match node.status {
                NodeStatus::Active => stats.active += 1,
                NodeStatus::Offline => stats.offline += 1,
            }
            if node.is_live(now, self.timeout) {
                stats.live += 1;
            }
            if node.is_leader {
                stats.leaders.push(node.label.clone());
            }
        }
        stats.nodes = nodes;
        Ok(stats)
    }

    /// Administrative delete of every node row; live nodes re-create theirs
    /// on the next heartbeat
    pub fn reset_nodes(&self) -> StoreResult<usize> {
        let removed = self.store.delete_all_nodes()?;
        tracing::warn!(count = removed, "All node records deleted");
        Ok(removed)
    }

    /// Start background task that heartbeats and runs elections
    pub fn start_heartbeat(
        self: Arc<Self>,
        every: StdDuration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.heartbeat() {
                            Ok(outcome) => tracing::debug!(?outcome, "Heartbeat written"),
                            Err(e) => Error::from(e).report("Heartbeat"),
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Heartbeat task shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Start background task that sweeps stale nodes
    pub fn start_sweeper(
        self: Arc<Self>,
        every: StdDuration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.sweep() {
                            Error::from(e).report("Node sweep");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Sweeper shutting down");
                        break;
                    }
                }
            }
        })
    }
}

// ============================================================================
// Cluster Stats
// ============================================================================

/// Snapshot of fleet membership
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterStats {
    pub total_nodes: usize,
    pub active: usize,
    pub offline: usize,
    /// ACTIVE with a fresh heartbeat
    pub live: usize,
    /// Labels of flagged leaders; more than one only during a race
    pub leaders: Vec<String>,
    pub nodes: Vec<Node>,
}

impl ClusterStats {
    /// Format as display string
    pub fn display(&self) -> String {
        let mut out = format!(
            "Cluster Stats\n\
             {:-<30}\n\
             Total Nodes: {}\n\
             - Active: {}\n\
             - Offline: {}\n\
             - Live: {}\n\
             Leader: {}",
            "",
            self.total_nodes,
            self.active,
            self.offline,
            self.live,
            if self.leaders.is_empty() {
                "(none)".to_string()
            } else {
                self.leaders.join(", ")
            }
        );

        for node in &self.nodes {
            out.push_str(&format!(
                "\n  {} {:<7} {}{}",
                node.last_heartbeat.format("%Y-%m-%d %H:%M:%S"),
                node.status.as_str(),
                node.label,
                if node.is_leader { " [leader]" } else { "" }
            ));
        }
        out
    }
}
