//! Prometheus metrics for fleetcrawl nodes
//!
//! This module provides metrics tracking for:
//! - Cluster: elections, swept nodes, leadership, live node count
//! - Crawl: pages fetched by outcome, fetch latency, assignments, frontier growth, completions
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails (or never happens), metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Encoder, Gauge, Histogram, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for membership and election metrics
struct ClusterMetrics {
    elections_won: Counter,
    nodes_swept: Counter,
    is_leader: Gauge,
    live_nodes: Gauge,
}

/// Container for scheduling and crawling metrics
struct CrawlMetrics {
    pages_fetched: CounterVec,
    fetch_duration: Histogram,
    tasks_assigned: Counter,
    tasks_reclaimed: Counter,
    children_created: Counter,
    jobs_completed: Counter,
}

static CLUSTER_METRICS: OnceLock<ClusterMetrics> = OnceLock::new();

static CRAWL_METRICS: OnceLock<CrawlMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// If metric registration fails, subsequent metric operations become no-ops.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = fleetcrawl::metrics::init_metrics() {
///     tracing::warn!(error = %e, "Metrics disabled");
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let cluster = ClusterMetrics {
        elections_won: register_counter!(
            "fleetcrawl_leader_elections_total",
            "Number of times this node acquired leadership"
        )?,
        nodes_swept: register_counter!(
            "fleetcrawl_nodes_swept_total",
            "Nodes marked OFFLINE by this node's sweeps"
        )?,
        is_leader: register_gauge!(
            "fleetcrawl_is_leader",
            "Whether this node currently holds leadership (1 = yes, 0 = no)"
        )?,
        live_nodes: register_gauge!(
            "fleetcrawl_live_nodes",
            "Live nodes seen by the last scheduling cycle"
        )?,
    };

    let crawl = CrawlMetrics {
        pages_fetched: register_counter_vec!(
            "fleetcrawl_pages_fetched_total",
            "Processed tasks by outcome",
            &["outcome"]
        )?,
        fetch_duration: register_histogram!(
            "fleetcrawl_fetch_duration_seconds",
            "Time spent fetching one page in seconds",
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 30.0]
        )?,
        tasks_assigned: register_counter!(
            "fleetcrawl_tasks_assigned_total",
            "Tasks assigned to nodes by this leader"
        )?,
        tasks_reclaimed: register_counter!(
            "fleetcrawl_tasks_reclaimed_total",
            "Tasks returned to PENDING from offline or removed nodes"
        )?,
        children_created: register_counter!(
            "fleetcrawl_children_created_total",
            "Child tasks created by frontier expansion"
        )?,
        jobs_completed: register_counter!(
            "fleetcrawl_jobs_completed_total",
            "Jobs moved to COMPLETED by this leader"
        )?,
    };

    CLUSTER_METRICS.set(cluster).map_err(|_| "Cluster metrics already initialized")?;
    CRAWL_METRICS.set(crawl).map_err(|_| "Crawl metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    CLUSTER_METRICS.get().is_some() && CRAWL_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// This node won an election round
pub fn record_election_won() {
    if let Some(m) = CLUSTER_METRICS.get() {
        m.elections_won.inc();
    }
}

pub fn record_nodes_swept(count: usize) {
    if let Some(m) = CLUSTER_METRICS.get() {
        m.nodes_swept.inc_by(count as f64);
    }
}

pub fn set_leader(is_leader: bool) {
    if let Some(m) = CLUSTER_METRICS.get() {
        m.is_leader.set(if is_leader { 1.0 } else { 0.0 });
    }
}

pub fn set_live_nodes(count: usize) {
    if let Some(m) = CLUSTER_METRICS.get() {
        m.live_nodes.set(count as f64);
    }
}

/// Count one processed task; `outcome` is `completed`, `failed`, `error` or `skipped`
pub fn record_page(outcome: &str) {
    if let Some(m) = CRAWL_METRICS.get() {
        m.pages_fetched.with_label_values(&[outcome]).inc();
    }
}

pub fn record_tasks_assigned(count: usize) {
    if let Some(m) = CRAWL_METRICS.get() {
        m.tasks_assigned.inc_by(count as f64);
    }
}

pub fn record_tasks_reclaimed(count: usize) {
    if let Some(m) = CRAWL_METRICS.get() {
        m.tasks_reclaimed.inc_by(count as f64);
    }
}

pub fn record_children_created(count: usize) {
    if let Some(m) = CRAWL_METRICS.get() {
        m.children_created.inc_by(count as f64);
    }
}

pub fn record_job_completed() {
    if let Some(m) = CRAWL_METRICS.get() {
        m.jobs_completed.inc();
    }
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start a fetch timer (records when the handle is dropped)
pub fn start_fetch_timer() -> MetricsTimer {
    match CRAWL_METRICS.get() {
        Some(m) => MetricsTimer::new(m.fetch_duration.start_timer()),
        None => MetricsTimer::noop(),
    }
}

// ============================================================================
// Tests
// ============================================================================
