//! Page crawling
//!
//! This module holds everything a node needs to turn an assigned task into a
//! result and new frontier entries:
//!
//! - [`fetcher`]: rate-limited HTTP transport behind the [`PageFetcher`] trait
//! - [`url`]: syntactic URL normalization and link resolution
//! - [`worker`]: the per-node task processing loop
//! - [`distributed`]: wiring of all loops of one node

pub mod distributed;
pub mod fetcher;
pub mod url;
pub mod worker;

pub use distributed::{DistributedRunner, RunnerHandle};
pub use fetcher::{FetchedPage, HttpFetcher, PageFetcher};
pub use worker::{CrawlWorker, TaskOutcome, WorkerReport};
