//! Integration tests for leader-only task scheduling
//!
//! These tests verify:
//! - Even spreading of pending work across live nodes
//! - Batch limits across consecutive cycles
//! - No double assignment while two nodes believe they lead

mod common;

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use fleetcrawl::config::SchedulerConfig;
use fleetcrawl::coordinator::{ClusterConfig, NodeRegistry};
use fleetcrawl::models::{Job, JobStatus, Task, TaskStatus};
use fleetcrawl::scheduler::TaskScheduler;
use fleetcrawl::storage::{CrawlStore, SqliteCrawlStore};

use common::memory_store;

fn registries(store: &Arc<SqliteCrawlStore>, count: usize) -> Vec<Arc<NodeRegistry>> {
    let all: Vec<_> = (0..count)
        .map(|_| Arc::new(NodeRegistry::new(store.clone(), &ClusterConfig::default())))
        .collect();
    for registry in &all {
        registry.register().unwrap();
    }
    for registry in &all {
        registry.heartbeat().unwrap();
    }
    all
}

fn leader_of(all: &[Arc<NodeRegistry>]) -> Arc<NodeRegistry> {
    all.iter()
        .find(|r| r.is_leader().unwrap())
        .cloned()
        .expect("one leader")
}

/// Job with a seed and `children` extra pending tasks
fn job_with_tasks(store: &SqliteCrawlStore, children: usize) -> Job {
    let job = Job::new("https://example.com/", 3, 500, "alice");
    let seed = Task::seed(&job);
    store.create_job(&job, &seed).unwrap();
    for i in 0..children {
        store
            .insert_task(&Task::child_of(&seed, format!("https://example.com/p/{i}")))
            .unwrap();
    }
    job
}

#[test]
fn test_even_spread_over_three_nodes() {
    let store = memory_store();
    let all = registries(&store, 3);
    let leader = leader_of(&all);
    let job = job_with_tasks(&store, 29);

    let scheduler = TaskScheduler::new(store.clone(), leader, SchedulerConfig::default());
    let report = scheduler.run_cycle().unwrap();
    assert_eq!(report.assigned, 30);
    assert_eq!(report.live_nodes, 3);

    let mut per_node: HashMap<_, usize> = HashMap::new();
    for task in store.list_tasks_for_job(job.id).unwrap() {
        assert_eq!(task.status, TaskStatus::Assigned);
        *per_node.entry(task.assigned_node.unwrap()).or_default() += 1;
    }
    assert_eq!(per_node.len(), 3);
    assert!(per_node.values().all(|&n| n == 10));
}

#[test]
fn test_batches_drain_over_cycles() {
    let store = memory_store();
    let all = registries(&store, 2);
    let leader = leader_of(&all);
    let job = job_with_tasks(&store, 119);

    let scheduler = TaskScheduler::new(store.clone(), leader, SchedulerConfig::default());
    let assigned: Vec<usize> = (0..4).map(|_| scheduler.run_cycle().unwrap().assigned).collect();
    assert_eq!(assigned, vec![50, 50, 20, 0]);
    assert_eq!(store.count_tasks(job.id, Some(TaskStatus::Pending)).unwrap(), 0);
    assert_eq!(store.get_job(job.id).unwrap().unwrap().status, JobStatus::Running);
}

#[test]
fn test_two_leaders_never_double_assign() {
    let store = memory_store();
    let all = registries(&store, 2);
    let first = leader_of(&all);
    let second = all
        .iter()
        .find(|r| r.node_id() != first.node_id())
        .cloned()
        .unwrap();

    // let the first leader look stale long enough for the second to grab the flag
    let now = Utc::now();
    let mut stale = store.get_node(first.node_id()).unwrap().unwrap();
    stale.last_heartbeat = now - Duration::seconds(60);
    store.upsert_node(&stale).unwrap();
    assert!(store
        .try_acquire_leadership(second.node_id(), now - Duration::seconds(15))
        .unwrap());
    assert!(store.touch_node(first.node_id(), Utc::now()).unwrap());
    assert!(first.is_leader().unwrap());
    assert!(second.is_leader().unwrap());

    let job = job_with_tasks(&store, 9);
    let a = TaskScheduler::new(store.clone(), first, SchedulerConfig::default());
    let b = TaskScheduler::new(store.clone(), second, SchedulerConfig::default());

    let total = a.run_cycle().unwrap().assigned + b.run_cycle().unwrap().assigned;
    assert_eq!(total, 10);
    assert_eq!(store.count_tasks(job.id, Some(TaskStatus::Assigned)).unwrap(), 10);
}
