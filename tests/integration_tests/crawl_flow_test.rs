//! End-to-end crawl flow tests

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fleetcrawl::crawler::HttpFetcher;
use fleetcrawl::jobs::JobService;
use fleetcrawl::models::{CrawlRequest, JobStatus, TaskStatus};
use fleetcrawl::notifications::{BroadcastNotifier, NoopNotifier, ProgressNotifier};
use fleetcrawl::storage::CrawlStore;

use super::fixtures::{EXAMPLE_SEED_HTML, LEAF_HTML};
use crate::common::{drive, html_page, memory_store, two_node_fleet, StubFetcher, TestNode};

fn example_fetcher() -> StubFetcher {
    let mut fetcher = StubFetcher::new().page("https://example.com/", 200, EXAMPLE_SEED_HTML);
    for i in 1..=8 {
        fetcher = fetcher.page(&format!("https://example.com/{i}"), 200, LEAF_HTML);
    }
    fetcher
}

#[tokio::test]
async fn test_example_scenario_two_nodes() {
    let store = memory_store();
    let fetcher = Arc::new(example_fetcher());
    let (leader, follower) = two_node_fleet(&store, fetcher.clone());

    let jobs = JobService::new(store.clone(), Arc::new(NoopNotifier));
    let job = jobs
        .submit(
            CrawlRequest::new("https://example.com", "alice")
                .with_max_depth(1)
                .with_max_pages(5),
        )
        .unwrap();

    drive(&[&leader, &follower], 10).await;

    let tasks = store.list_tasks_for_job(job.id).unwrap();
    assert_eq!(tasks.len(), 5, "task count never exceeds max_pages");

    let seed = tasks.iter().find(|t| t.depth == 0).unwrap();
    assert_eq!(seed.url, "https://example.com/");
    assert_eq!(seed.status, TaskStatus::Completed);

    let children: Vec<_> = tasks.iter().filter(|t| t.depth > 0).collect();
    assert_eq!(children.len(), 4);
    assert!(children.iter().all(|t| t.depth == 1));
    assert!(children.iter().all(|t| t.status == TaskStatus::Completed));

    let urls: HashSet<_> = tasks.iter().map(|t| t.url.as_str()).collect();
    assert_eq!(urls.len(), 5, "one task per URL");

    // both nodes did work
    let workers: HashSet<_> = tasks.iter().filter_map(|t| t.assigned_node).collect();
    assert!(workers.contains(&leader.node_id()));
    assert!(workers.contains(&follower.node_id()));

    let job = store.get_job(job.id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());

    let results = store.list_results(job.id).unwrap();
    assert_eq!(results.len(), 5);
    let seed_result = results.iter().find(|r| r.task_id == seed.id).unwrap();
    assert_eq!(seed_result.title.as_deref(), Some("Example Domain"));
    assert_eq!(seed_result.link_count, 12);
    assert_eq!(fetcher.calls(), 5);
}

#[tokio::test]
async fn test_depth_limit_over_http() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_page("Root", &["/a", "/b"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_page("A", &["/c"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_page("C", &["/d"])))
        .mount(&server)
        .await;

    let store = memory_store();
    let fetcher = Arc::new(HttpFetcher::with_config(Duration::from_secs(5), 0, "fleetcrawl-test").unwrap());
    let node = TestNode::new(&store, fetcher, Arc::new(NoopNotifier));
    node.registry.heartbeat().unwrap();

    let jobs = JobService::new(store.clone(), Arc::new(NoopNotifier));
    let job = jobs
        .submit(CrawlRequest::new(format!("{base}/"), "bob").with_max_depth(2).with_max_pages(10))
        .unwrap();

    drive(&[&node], 10).await;

    let tasks = store.list_tasks_for_job(job.id).unwrap();
    let by_url = |suffix: &str| {
        tasks
            .iter()
            .find(|t| t.url == format!("{base}{suffix}"))
            .cloned()
    };

    assert_eq!(by_url("/a").unwrap().depth, 1);
    assert_eq!(by_url("/c").unwrap().depth, 2);
    assert!(by_url("/d").is_none(), "no tasks beyond max_depth");
    assert_eq!(by_url("/b").unwrap().status, TaskStatus::Failed);

    let results = store.list_results(job.id).unwrap();
    assert_eq!(results.len(), 4);
    let b = results.iter().find(|r| r.url.ends_with("/b")).unwrap();
    assert_eq!(b.status_code, 404);
    assert_eq!(b.error_message.as_deref(), Some("HTTP 404"));

    // three pages completed out of a budget of ten: the job keeps running
    assert_eq!(store.get_job(job.id).unwrap().unwrap().status, JobStatus::Running);
}

#[tokio::test]
async fn test_progress_events_per_job() {
    let store = memory_store();
    let broadcast = Arc::new(BroadcastNotifier::default());
    let notifier: Arc<dyn ProgressNotifier> = broadcast.clone();

    let fetcher = Arc::new(
        StubFetcher::new()
            .page("https://example.com/", 200, &html_page("Home", &["/x"]))
            .page("https://example.com/x", 200, LEAF_HTML),
    );
    let node = TestNode::new(&store, fetcher, notifier.clone());
    node.registry.heartbeat().unwrap();

    let jobs = JobService::new(store.clone(), notifier);
    let job = jobs
        .submit(CrawlRequest::new("https://example.com/", "carol").with_max_depth(1).with_max_pages(2))
        .unwrap();
    let mut rx = broadcast.subscribe_job(job.id);

    drive(&[&node], 10).await;

    let mut messages = Vec::new();
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.job_id, job.id);
        messages.push(event.message);
    }

    assert!(messages.contains(&"Processed https://example.com/".to_string()));
    assert!(messages.contains(&"Processed https://example.com/x".to_string()));
    assert_eq!(messages.last().map(String::as_str), Some("Crawl completed"));
}

/// A job whose seed was handed out outside a scheduler cycle still runs to completion
#[tokio::test]
async fn test_direct_assignment_starts_job() {
    let store = memory_store();
    let fetcher = Arc::new(StubFetcher::new().page("https://example.com/", 200, LEAF_HTML));
    let (leader, follower) = two_node_fleet(&store, fetcher);

    let job = JobService::new(store.clone(), Arc::new(NoopNotifier))
        .submit(
            CrawlRequest::new("https://example.com/", "alice")
                .with_max_depth(1)
                .with_max_pages(1),
        )
        .unwrap();
    let seed = store.list_tasks_for_job(job.id).unwrap().remove(0);

    assert!(store
        .assign_task(seed.id, follower.node_id(), chrono::Utc::now())
        .unwrap()
        .is_assigned());
    let started = store.get_job(job.id).unwrap().unwrap();
    assert_eq!(started.status, JobStatus::Running);
    assert!(started.started_at.is_some());

    drive(&[&leader, &follower], 10).await;

    let done = store.get_job(job.id).unwrap().unwrap();
    assert_eq!(store.count_tasks(job.id, Some(TaskStatus::Completed)).unwrap(), 1);
    assert_eq!(done.status, JobStatus::Completed);
}
