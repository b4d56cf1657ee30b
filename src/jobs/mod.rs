//! Crawl job submission and lifecycle
//!
//! - [`JobService`] validates requests and queues jobs with their seed task
//! - [`JobLifecycleManager`] closes RUNNING jobs once their page budget is met
//!
//! Jobs move strictly PENDING -> RUNNING -> COMPLETED. There is no failed job
//! state: a job whose pages all fail stays RUNNING until its budget is met or
//! the exhausted-frontier rule is enabled.

pub mod lifecycle;
pub mod submission;

pub use lifecycle::{JobLifecycleManager, LifecycleReport};
pub use submission::{JobService, SubmissionError};
