//! Error handling and recovery scenarios

use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;

use fleetcrawl::crawler::{HttpFetcher, TaskOutcome};
use fleetcrawl::jobs::JobService;
use fleetcrawl::models::{CrawlRequest, JobStatus, NodeStatus, TaskStatus};
use fleetcrawl::notifications::NoopNotifier;
use fleetcrawl::storage::CrawlStore;

use super::fixtures::{LEAF_HTML, PAGE_A_HTML, PAGE_B_HTML};
use crate::common::{drive, html_page, memory_store, two_node_fleet, StubFetcher, TestNode};

fn jobs(store: &Arc<fleetcrawl::storage::SqliteCrawlStore>) -> JobService {
    JobService::new(store.clone(), Arc::new(NoopNotifier))
}

#[tokio::test]
async fn test_http_error_page_fails_task() {
    let store = memory_store();
    let fetcher = Arc::new(
        StubFetcher::new().page("https://example.com/", 404, &html_page("Not Found", &["/a"])),
    );
    let node = TestNode::new(&store, fetcher, Arc::new(NoopNotifier));
    node.registry.heartbeat().unwrap();

    let job = jobs(&store)
        .submit(CrawlRequest::new("https://example.com/", "alice"))
        .unwrap();
    drive(&[&node], 5).await;

    let tasks = store.list_tasks_for_job(job.id).unwrap();
    assert_eq!(tasks.len(), 1, "no children from an error page");
    assert_eq!(tasks[0].status, TaskStatus::Failed);
    assert!(tasks[0].completed_at.is_some());

    let results = store.list_results(job.id).unwrap();
    assert_eq!(results[0].status_code, 404);
    assert_eq!(results[0].error_message.as_deref(), Some("HTTP 404"));
    assert_eq!(results[0].title.as_deref(), Some("Not Found"));

    // jobs never fail; it stays running
    assert_eq!(store.get_job(job.id).unwrap().unwrap().status, JobStatus::Running);
}

#[tokio::test]
async fn test_connection_refused_records_status_zero() {
    // reserve a port, then free it so nothing listens there
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let store = memory_store();
    let fetcher = Arc::new(
        HttpFetcher::with_config(std::time::Duration::from_secs(2), 0, "fleetcrawl-test").unwrap(),
    );
    let node = TestNode::new(&store, fetcher, Arc::new(NoopNotifier));
    node.registry.heartbeat().unwrap();

    let job = jobs(&store)
        .submit(CrawlRequest::new(format!("http://127.0.0.1:{port}/"), "alice"))
        .unwrap();
    drive(&[&node], 5).await;

    let task = &store.list_tasks_for_job(job.id).unwrap()[0];
    assert_eq!(task.status, TaskStatus::Failed);

    let result = &store.list_results(job.id).unwrap()[0];
    assert_eq!(result.status_code, 0);
    assert_eq!(result.link_count, 0);
    assert!(result.error_message.as_deref().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn test_duplicate_discovery_creates_one_task_per_url() {
    let store = memory_store();
    let fetcher = Arc::new(
        StubFetcher::new()
            .page("https://example.com/", 200, &html_page("Root", &["/a", "/b", "/a"]))
            .page("https://example.com/a", 200, PAGE_A_HTML)
            .page("https://example.com/b", 200, PAGE_B_HTML)
            .page("https://example.com/shared", 200, LEAF_HTML),
    );
    let (leader, follower) = two_node_fleet(&store, fetcher.clone());

    let job = jobs(&store)
        .submit(CrawlRequest::new("https://example.com/", "alice").with_max_depth(3).with_max_pages(50))
        .unwrap();
    drive(&[&leader, &follower], 10).await;

    let tasks = store.list_tasks_for_job(job.id).unwrap();
    let urls: Vec<_> = tasks.iter().map(|t| t.url.clone()).collect();
    let distinct: HashSet<_> = urls.iter().collect();
    assert_eq!(urls.len(), distinct.len());
    assert_eq!(tasks.len(), 4);
    assert!(tasks.iter().all(|t| t.status == TaskStatus::Completed));

    let results = store.list_results(job.id).unwrap();
    let result_tasks: HashSet<_> = results.iter().map(|r| r.task_id).collect();
    assert_eq!(results.len(), 4);
    assert_eq!(result_tasks.len(), 4, "no task has two results");
    assert_eq!(fetcher.calls(), 4);
}

#[tokio::test]
async fn test_orphaned_tasks_are_reclaimed() {
    let store = memory_store();
    let fetcher = Arc::new(StubFetcher::new().page("https://example.com/", 200, LEAF_HTML));
    let (leader, follower) = two_node_fleet(&store, fetcher);

    let job = jobs(&store)
        .submit(CrawlRequest::new("https://example.com/", "alice").with_max_pages(1))
        .unwrap();
    let seed = store.list_tasks_for_job(job.id).unwrap().remove(0);

    // the follower takes the seed and dies before finishing it
    assert!(store
        .assign_task(seed.id, follower.node_id(), Utc::now())
        .unwrap()
        .is_assigned());
    let mut dead = store.get_node(follower.node_id()).unwrap().unwrap();
    dead.last_heartbeat = Utc::now() - Duration::seconds(60);
    store.upsert_node(&dead).unwrap();

    assert_eq!(leader.registry.sweep().unwrap(), 1);
    assert_eq!(
        store.get_node(follower.node_id()).unwrap().unwrap().status,
        NodeStatus::Offline
    );

    let report = leader.scheduler.run_cycle().unwrap();
    assert_eq!(report.reclaimed, 1);
    assert_eq!(report.assigned, 1);
    let seed = store.get_task(seed.id).unwrap().unwrap();
    assert_eq!(seed.assigned_node, Some(leader.node_id()));

    // the dead node's stale copy of the task is rejected
    let late = follower.worker.process_task(seed.clone()).await.unwrap();
    assert_eq!(late, TaskOutcome::Lost);

    let report = leader.worker.run_cycle().await.unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(store.list_results(job.id).unwrap().len(), 1);

    leader.lifecycle.run_cycle().unwrap();
    assert_eq!(store.get_job(job.id).unwrap().unwrap().status, JobStatus::Completed);
}

#[tokio::test]
async fn test_reclaim_disabled_leaves_tasks_stranded() {
    use fleetcrawl::config::SchedulerConfig;
    use fleetcrawl::scheduler::TaskScheduler;

    let store = memory_store();
    let fetcher = Arc::new(StubFetcher::new());
    let (leader, follower) = two_node_fleet(&store, fetcher);

    let job = jobs(&store)
        .submit(CrawlRequest::new("https://example.com/", "alice"))
        .unwrap();
    let seed = store.list_tasks_for_job(job.id).unwrap().remove(0);
    store.assign_task(seed.id, follower.node_id(), Utc::now()).unwrap();

    let mut dead = store.get_node(follower.node_id()).unwrap().unwrap();
    dead.last_heartbeat = Utc::now() - Duration::seconds(60);
    store.upsert_node(&dead).unwrap();
    leader.registry.sweep().unwrap();

    let strict = TaskScheduler::new(
        store.clone(),
        leader.registry.clone(),
        SchedulerConfig {
            reclaim_orphans: false,
            ..SchedulerConfig::default()
        },
    );
    let report = strict.run_cycle().unwrap();
    assert_eq!(report.reclaimed, 0);
    assert_eq!(store.get_task(seed.id).unwrap().unwrap().status, TaskStatus::Assigned);
}

#[tokio::test]
async fn test_tasks_of_reset_nodes_are_reclaimed() {
    let store = memory_store();
    let fetcher = Arc::new(StubFetcher::new().page("https://example.com/", 200, LEAF_HTML));
    let (leader, follower) = two_node_fleet(&store, fetcher);

    let job = jobs(&store)
        .submit(CrawlRequest::new("https://example.com/", "alice").with_max_pages(1))
        .unwrap();
    let seed = store.list_tasks_for_job(job.id).unwrap().remove(0);
    store.assign_task(seed.id, follower.node_id(), Utc::now()).unwrap();

    // node rows wiped while the follower held the seed; only the leader returns
    assert_eq!(leader.registry.reset_nodes().unwrap(), 2);
    leader.registry.heartbeat().unwrap();
    assert!(leader.registry.is_leader().unwrap());

    let report = leader.scheduler.run_cycle().unwrap();
    assert_eq!(report.reclaimed, 1);
    assert_eq!(report.assigned, 1);
    assert_eq!(
        store.get_task(seed.id).unwrap().unwrap().assigned_node,
        Some(leader.node_id())
    );

    drive(&[&leader], 5).await;
    assert_eq!(store.get_job(job.id).unwrap().unwrap().status, JobStatus::Completed);
}
