//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use fleetcrawl::config::{LifecycleConfig, SchedulerConfig};
use fleetcrawl::coordinator::{ClusterConfig, NodeRegistry};
use fleetcrawl::crawler::{CrawlWorker, FetchedPage, PageFetcher};
use fleetcrawl::jobs::JobLifecycleManager;
use fleetcrawl::notifications::{NoopNotifier, ProgressNotifier};
use fleetcrawl::scheduler::TaskScheduler;
use fleetcrawl::storage::SqliteCrawlStore;
use fleetcrawl::utils::error::FetchError;

/// Fresh in-memory store
pub fn memory_store() -> Arc<SqliteCrawlStore> {
    Arc::new(SqliteCrawlStore::in_memory().expect("in-memory store"))
}

/// Canned page responses keyed by URL; unknown URLs fail with a timeout
#[derive(Default)]
pub struct StubFetcher {
    pages: Mutex<HashMap<String, (u16, String)>>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, status: u16, body: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let page = self.pages.lock().unwrap().get(url).cloned();
        match page {
            Some((status, body)) => Ok(FetchedPage {
                final_url: url.to_string(),
                status,
                body,
            }),
            None => Err(FetchError::Timeout),
        }
    }
}

/// HTML page with a title and the given links
pub fn html_page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{href}">{href}</a>"#))
        .collect();
    format!("<html><head><title>{title}</title></head><body>{anchors}</body></html>")
}

/// One simulated process: registry plus all loops, driven by hand
pub struct TestNode {
    pub registry: Arc<NodeRegistry>,
    pub scheduler: TaskScheduler,
    pub worker: CrawlWorker,
    pub lifecycle: JobLifecycleManager,
}

impl TestNode {
    pub fn new(
        store: &Arc<SqliteCrawlStore>,
        fetcher: Arc<dyn PageFetcher>,
        notifier: Arc<dyn ProgressNotifier>,
    ) -> Self {
        let registry = Arc::new(NodeRegistry::new(store.clone(), &ClusterConfig::default()));
        registry.register().expect("register");

        Self {
            scheduler: TaskScheduler::new(store.clone(), registry.clone(), SchedulerConfig::default()),
            worker: CrawlWorker::new(
                store.clone(),
                fetcher,
                notifier.clone(),
                registry.node_id(),
                4,
            ),
            lifecycle: JobLifecycleManager::new(
                store.clone(),
                registry.clone(),
                notifier,
                LifecycleConfig::default(),
            ),
            registry,
        }
    }

    pub fn node_id(&self) -> uuid::Uuid {
        self.registry.node_id()
    }
}

/// Two registered nodes sharing a fetcher; the first one is leader
pub fn two_node_fleet(store: &Arc<SqliteCrawlStore>, fetcher: Arc<dyn PageFetcher>) -> (TestNode, TestNode) {
    let notifier: Arc<dyn ProgressNotifier> = Arc::new(NoopNotifier);
    let first = TestNode::new(store, fetcher.clone(), notifier.clone());
    let second = TestNode::new(store, fetcher, notifier);
    first.registry.heartbeat().expect("heartbeat");
    second.registry.heartbeat().expect("heartbeat");

    if first.registry.is_leader().expect("is_leader") {
        (first, second)
    } else {
        (second, first)
    }
}

/// Drive scheduling, processing and completion until nothing changes
pub async fn drive(nodes: &[&TestNode], max_rounds: usize) {
    for _ in 0..max_rounds {
        let mut progress = 0;
        for node in nodes {
            progress += node.scheduler.run_cycle().expect("schedule").assigned;
        }
        for node in nodes {
            let report = node.worker.run_cycle().await.expect("work");
            progress += report.claimed;
        }
        for node in nodes {
            progress += node.lifecycle.run_cycle().expect("lifecycle").completed;
        }
        if progress == 0 {
            return;
        }
    }
}
