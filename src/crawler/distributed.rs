//! Node runner
//!
//! Wires one node together: registration, then five independent loops that
//! share nothing but the store and a shutdown signal.
//!
//! ```text
//! heartbeat + election   every H    (all nodes)
//! sweep stale nodes      every ~10s (all nodes)
//! schedule tasks         every ~2s  (leader only)
//! process own tasks      every ~1s  (all nodes)
//! complete jobs          every ~5s  (leader only)
//! ```

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::Config;
use crate::coordinator::NodeRegistry;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::worker::CrawlWorker;
use crate::error;
use crate::jobs::JobLifecycleManager;
use crate::models::Node;
use crate::notifications::ProgressNotifier;
use crate::scheduler::TaskScheduler;
use crate::storage::CrawlStore;

// ============================================================================
// Node Runner
// ============================================================================

/// Runs every background loop of one fleet node
pub struct DistributedRunner {
    config: Config,
    registry: Arc<NodeRegistry>,
    scheduler: Arc<TaskScheduler>,
    worker: Arc<CrawlWorker>,
    lifecycle: Arc<JobLifecycleManager>,

    /// Shutdown signal
    shutdown: watch::Sender<bool>,

    /// Shutdown receiver
    shutdown_rx: watch::Receiver<bool>,
}

impl DistributedRunner {
    pub fn new(
        config: Config,
        store: Arc<dyn CrawlStore>,
        fetcher: Arc<dyn PageFetcher>,
        notifier: Arc<dyn ProgressNotifier>,
    ) -> Self {
        let registry = Arc::new(NodeRegistry::new(store.clone(), &config.cluster));
        Self::with_registry(config, store, fetcher, notifier, registry)
    }

    /// Build around an existing registry, e.g. one with a fixed node id
    pub fn with_registry(
        config: Config,
        store: Arc<dyn CrawlStore>,
        fetcher: Arc<dyn PageFetcher>,
        notifier: Arc<dyn ProgressNotifier>,
        registry: Arc<NodeRegistry>,
    ) -> Self {
        let scheduler = Arc::new(TaskScheduler::new(
            store.clone(),
            registry.clone(),
            config.scheduler.clone(),
        ));
        let worker = Arc::new(CrawlWorker::new(
            store.clone(),
            fetcher,
            notifier.clone(),
            registry.node_id(),
            config.worker.max_concurrent_tasks,
        ));
        let lifecycle = Arc::new(JobLifecycleManager::new(
            store,
            registry.clone(),
            notifier,
            config.lifecycle.clone(),
        ));

        let (shutdown, shutdown_rx) = watch::channel(false);

        Self {
            config,
            registry,
            scheduler,
            worker,
            lifecycle,
            shutdown,
            shutdown_rx,
        }
    }

    pub fn node_id(&self) -> Uuid {
        self.registry.node_id()
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Register the node and spawn all loops
    ///
    /// # Errors
    ///
    /// Fails if the cluster timing is inconsistent or the node row cannot be
    /// written; later loop errors are logged and retried on the next tick.
    pub fn start(&self) -> error::Result<RunnerHandle> {
        self.config.cluster.validate()?;
        let node: Node = self.registry.register()?;
        tracing::info!(
            node_id = %node.id,
            label = %node.label,
            "Node registered, starting loops"
        );

        let cluster = &self.config.cluster;
        let handles = vec![
            self.registry
                .clone()
                .start_heartbeat(cluster.heartbeat_interval(), self.shutdown_rx.clone()),
            self.registry
                .clone()
                .start_sweeper(cluster.sweep_interval(), self.shutdown_rx.clone()),
            self.scheduler
                .clone()
                .start(self.config.scheduler_interval(), self.shutdown_rx.clone()),
            self.worker
                .clone()
                .start(self.config.worker_interval(), self.shutdown_rx.clone()),
            self.lifecycle
                .clone()
                .start(self.config.lifecycle_interval(), self.shutdown_rx.clone()),
        ];

        Ok(RunnerHandle {
            handles,
            shutdown: self.shutdown.clone(),
        })
    }

    /// Trigger shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

// ============================================================================
// Runner Handle
// ============================================================================

/// Handle to the running node loops
pub struct RunnerHandle {
    handles: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl RunnerHandle {
    /// Wait for all loops to exit
    pub async fn wait(self) {
        for result in futures::future::join_all(self.handles).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Background loop panicked");
            }
        }
    }

    /// Trigger shutdown and wait
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        self.wait().await;
    }

    /// Check if every loop is still running
    pub fn is_running(&self) -> bool {
        self.handles.iter().all(|h| !h.is_finished())
    }
}
