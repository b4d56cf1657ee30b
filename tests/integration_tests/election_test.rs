//! Leader election and liveness tests

use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use fleetcrawl::coordinator::{run_election, ClusterConfig, ElectionOutcome, NodeRegistry};
use fleetcrawl::models::{Node, NodeStatus};
use fleetcrawl::storage::CrawlStore;

use crate::common::memory_store;

fn timeout() -> Duration {
    Duration::seconds(15)
}

#[test]
fn test_single_leader_after_rounds() {
    let store = memory_store();
    let registries: Vec<_> = (0..4)
        .map(|_| Arc::new(NodeRegistry::new(store.clone(), &ClusterConfig::default())))
        .collect();
    for registry in &registries {
        registry.register().unwrap();
    }

    for _ in 0..3 {
        for registry in &registries {
            registry.heartbeat().unwrap();
        }
        let leaders = store
            .list_nodes()
            .unwrap()
            .into_iter()
            .filter(|n| n.is_leader)
            .count();
        assert_eq!(leaders, 1);
    }

    let stats = registries[0].cluster_overview().unwrap();
    assert_eq!(stats.total_nodes, 4);
    assert_eq!(stats.live, 4);
    assert_eq!(stats.leaders.len(), 1);
}

#[test]
fn test_cas_blocks_second_promotion() {
    let store = memory_store();
    let now = Utc::now();
    let a = Node::new(Uuid::new_v4(), "a");
    let b = Node::new(Uuid::new_v4(), "b");
    store.upsert_node(&a).unwrap();
    store.upsert_node(&b).unwrap();

    assert!(store.try_acquire_leadership(a.id, now - timeout()).unwrap());
    // b read "no leader" before a's promotion landed
    assert!(!store.try_acquire_leadership(b.id, now - timeout()).unwrap());

    let outcome = run_election(store.as_ref(), b.id, timeout(), now).unwrap();
    assert_eq!(outcome, ElectionOutcome::LeaderHealthy { leader: a.id });
}

#[test]
fn test_stale_leader_replaced() {
    let store = memory_store();
    let now = Utc::now();

    let mut old = Node::new(Uuid::new_v4(), "old");
    old.last_heartbeat = now - Duration::seconds(60);
    store.upsert_node(&old).unwrap();
    assert!(store
        .try_acquire_leadership(old.id, now - Duration::seconds(120))
        .unwrap());

    let fresh = Node::new(Uuid::new_v4(), "fresh");
    store.upsert_node(&fresh).unwrap();

    let outcome = run_election(store.as_ref(), fresh.id, timeout(), now).unwrap();
    assert_eq!(outcome, ElectionOutcome::Elected { leader: fresh.id });
    assert!(!store.get_node(old.id).unwrap().unwrap().is_leader);
    assert!(store.get_node(fresh.id).unwrap().unwrap().is_leader);
}

#[test]
fn test_sweep_marks_stale_offline_and_strips_leadership() {
    let store = memory_store();
    let now = Utc::now();

    let mut stale = Node::new(Uuid::new_v4(), "stale");
    stale.last_heartbeat = now - Duration::seconds(30);
    store.upsert_node(&stale).unwrap();
    assert!(store
        .try_acquire_leadership(stale.id, now - Duration::seconds(60))
        .unwrap());

    let live = Arc::new(NodeRegistry::new(store.clone(), &ClusterConfig::default()));
    live.register().unwrap();

    assert_eq!(live.sweep().unwrap(), 1);
    let swept = store.get_node(stale.id).unwrap().unwrap();
    assert_eq!(swept.status, NodeStatus::Offline);
    assert!(!swept.is_leader);

    // the next heartbeat elects the survivor
    let outcome = live.heartbeat().unwrap();
    assert_eq!(outcome.leader(), Some(live.node_id()));
    assert!(live.is_leader().unwrap());
}

#[test]
fn test_no_candidates_without_fresh_nodes() {
    let store = memory_store();
    let now = Utc::now();
    let mut node = Node::new(Uuid::new_v4(), "late");
    node.last_heartbeat = now - Duration::seconds(60);
    store.upsert_node(&node).unwrap();

    let outcome = run_election(store.as_ref(), node.id, timeout(), now).unwrap();
    assert_eq!(outcome, ElectionOutcome::NoCandidates);
    assert!(outcome.leader().is_none());
}

#[test]
fn test_heartbeat_recreates_missing_row_and_reset() {
    let store = memory_store();
    let registry = NodeRegistry::new(store.clone(), &ClusterConfig::default());
    registry.register().unwrap();

    assert_eq!(registry.reset_nodes().unwrap(), 1);
    assert!(!registry.is_leader().unwrap());

    registry.heartbeat().unwrap();
    assert!(store.get_node(registry.node_id()).unwrap().is_some());
    assert!(registry.is_leader().unwrap());
}

/// Two processes sharing one database file agree on a single leader
#[test]
fn test_shared_file_store_single_leader() {
    use fleetcrawl::storage::SqliteCrawlStore;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fleet.db");
    let busy = std::time::Duration::from_secs(5);

    let store_a = Arc::new(SqliteCrawlStore::new(&path, busy).unwrap());
    let store_b = Arc::new(SqliteCrawlStore::new(&path, busy).unwrap());
    let a = NodeRegistry::new(store_a.clone(), &ClusterConfig::default());
    let b = NodeRegistry::new(store_b.clone(), &ClusterConfig::default());
    a.register().unwrap();
    b.register().unwrap();

    for _ in 0..2 {
        a.heartbeat().unwrap();
        b.heartbeat().unwrap();
    }

    assert_eq!(store_b.list_nodes().unwrap().len(), 2);
    assert!(a.is_leader().unwrap() ^ b.is_leader().unwrap());
}
