//! Progress notifications
//!
//! Workers and the lifecycle manager publish a [`ProgressEvent`] whenever a
//! task finishes, a job is queued, or a job completes. Delivery is
//! fire-and-forget: a notifier never fails the operation that produced the
//! event, and events may be dropped when nobody listens.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  CrawlWorker / JobService / Lifecycle    │
//! └──────────────────────────────────────────┘
//!                     │ notify(&ProgressEvent)
//!                     ▼
//!             ┌───────────────┐
//!             │ FanoutNotifier│
//!             └───────────────┘
//!                 │        │
//!                 ▼        ▼
//!   ┌───────────────────┐ ┌─────────────┐
//!   │ BroadcastNotifier │ │ LogNotifier │
//!   │  crawls           │ │  (tracing)  │
//!   │  crawls/{job_id}  │ └─────────────┘
//!   └───────────────────┘
//! ```

mod broadcast;

use std::sync::Arc;

pub use crate::models::ProgressEvent;
pub use broadcast::BroadcastNotifier;

/// Topic every event is published on
pub const GLOBAL_TOPIC: &str = "crawls";

/// Per-job topic name
pub fn job_topic(job_id: uuid::Uuid) -> String {
    format!("{GLOBAL_TOPIC}/{job_id}")
}

/// Sink for progress events
pub trait ProgressNotifier: Send + Sync {
    /// Publish one event; must not block on slow consumers
    fn notify(&self, event: &ProgressEvent);
}

/// Writes every event to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl ProgressNotifier for LogNotifier {
    fn notify(&self, event: &ProgressEvent) {
        tracing::info!(
            job_id = %event.job_id,
            status = %event.status,
            processed = event.processed,
            pending = event.pending,
            "{}",
            event.message
        );
    }
}

/// Discards events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ProgressNotifier for NoopNotifier {
    fn notify(&self, _event: &ProgressEvent) {}
}

/// Forwards each event to several notifiers in order
#[derive(Default, Clone)]
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn ProgressNotifier>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn ProgressNotifier>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ProgressNotifier for FanoutNotifier {
    fn notify(&self, event: &ProgressEvent) {
        for sink in &self.sinks {
            sink.notify(event);
        }
    }
}
