//! Crate-wide error type
//!
//! Each layer raises its own error: [`FetchError`] and [`ParseError`] on the
//! crawl path, [`StoreError`] from the shared store, [`SubmissionError`] from
//! job intake and [`ConfigError`] from cluster settings. The background loops
//! and the runner fold them into [`Error`] so every failure is reported the
//! same way: a category plus whether the next tick may succeed.
//!
//! ```rust,ignore
//! use fleetcrawl::error::Error;
//!
//! if let Err(e) = scheduler.run_cycle() {
//!     Error::from(e).report("Scheduling cycle");
//! }
//! ```

use thiserror::Error;

pub use crate::coordinator::ConfigError;
pub use crate::jobs::SubmissionError;
pub use crate::storage::StoreError;
pub use crate::utils::error::{FetchError, ParseError};

/// Classification and retry hint shared by fleetcrawl errors
pub trait FleetErrorTrait: std::error::Error {
    /// Whether the same operation may succeed on a later tick
    fn is_recoverable(&self) -> bool;

    fn category(&self) -> ErrorCategory;
}

/// Where an error came from, for log fields and exit messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Page fetches (HTTP, timeouts, bodies)
    Network,
    /// URLs that cannot be crawled
    Parsing,
    /// The shared store
    Storage,
    /// Forbidden state moves, usually a lost race between nodes
    Coordination,
    /// A job request that failed validation
    Request,
    /// Cluster timing and identity settings
    Config,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Coordination => "coordination",
            Self::Request => "request",
            Self::Config => "config",
        }
    }
}

/// Any failure a fleetcrawl node can run into
#[derive(Error, Debug)]
pub enum Error {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Uncrawlable URL: {0}")]
    Parse(#[from] ParseError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Job rejected: {0}")]
    Submission(#[from] SubmissionError),

    #[error("Cluster config: {0}")]
    Cluster(#[from] ConfigError),
}

impl FleetErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::Parse(e) => e.is_recoverable(),
            Self::Store(e) => e.is_recoverable(),
            Self::Submission(e) => e.is_recoverable(),
            Self::Cluster(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(_) => ErrorCategory::Network,
            Self::Parse(_) => ErrorCategory::Parsing,
            Self::Store(StoreError::IllegalTransition(_)) => ErrorCategory::Coordination,
            Self::Store(_) => ErrorCategory::Storage,
            Self::Submission(SubmissionError::InvalidRequest { .. }) => ErrorCategory::Request,
            Self::Submission(SubmissionError::Store(_)) => ErrorCategory::Storage,
            Self::Cluster(_) => ErrorCategory::Config,
        }
    }
}

impl Error {
    /// Log a failed loop iteration; recoverable errors are warnings, the rest
    /// are errors since retrying will not help
    pub fn report(&self, activity: &str) {
        let category = self.category().as_str();
        if self.is_recoverable() {
            tracing::warn!(error = %self, category, "{activity} failed, retrying next tick");
        } else {
            tracing::error!(error = %self, category, "{activity} failed");
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
