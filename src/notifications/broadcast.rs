//! In-process broadcast channels for progress events

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;
use uuid::Uuid;

use super::{job_topic, ProgressNotifier, GLOBAL_TOPIC};
use crate::models::{JobStatus, ProgressEvent};

/// Publishes events on a global channel and on one channel per job
///
/// Subscribers that fall behind lose the oldest events (`RecvError::Lagged`).
/// A job's channel is dropped once its completion event has been sent.
pub struct BroadcastNotifier {
    capacity: usize,
    global: broadcast::Sender<ProgressEvent>,
    per_job: Mutex<HashMap<Uuid, broadcast::Sender<ProgressEvent>>>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (global, _) = broadcast::channel(capacity);
        Self {
            capacity,
            global,
            per_job: Mutex::new(HashMap::new()),
        }
    }

    /// Receive events of every job
    pub fn subscribe_all(&self) -> broadcast::Receiver<ProgressEvent> {
        self.global.subscribe()
    }

    /// Receive events of one job only
    pub fn subscribe_job(&self, job_id: Uuid) -> broadcast::Receiver<ProgressEvent> {
        let mut per_job = self.per_job.lock().unwrap_or_else(|e| e.into_inner());
        per_job
            .entry(job_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of jobs that currently have a dedicated channel
    pub fn job_channels(&self) -> usize {
        self.per_job.lock().map(|m| m.len()).unwrap_or(0)
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ProgressNotifier for BroadcastNotifier {
    fn notify(&self, event: &ProgressEvent) {
        // send only fails when nobody is subscribed
        let _ = self.global.send(event.clone());

        let mut per_job = self.per_job.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(sender) = per_job.get(&event.job_id) {
            let _ = sender.send(event.clone());
        }

        if event.status == JobStatus::Completed {
            per_job.remove(&event.job_id);
        } else {
            per_job.retain(|_, sender| sender.receiver_count() > 0);
        }

        tracing::trace!(
            topic = GLOBAL_TOPIC,
            job_topic = %job_topic(event.job_id),
            "Progress event published"
        );
    }
}
