//! Durable shared store
//!
//! Every node process opens the same store; it is the only channel through
//! which nodes coordinate. All state transitions are expressed as single
//! conditional statements (or short `IMMEDIATE` transactions) so that
//! overlapping execution across processes is safe.
//!
//! - [`repository`] - the [`CrawlStore`] trait consumed by the core
//! - [`sqlite`] - SQLite implementation (file-backed or in-memory)

pub mod repository;
pub mod sqlite;

use thiserror::Error;

pub use repository::{Assignment, ChildInsert, CrawlStore};
pub use sqlite::SqliteCrawlStore;

/// Errors raised by store implementations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Caller asked for a transition the state machine forbids
    #[error(transparent)]
    IllegalTransition(#[from] crate::models::TransitionError),

    /// Connection mutex poisoned by a panicking holder
    #[error("Store connection lock poisoned")]
    LockPoisoned,

    /// Failed to prepare the database location
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Busy/locked databases clear up on the next tick
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            Self::Io(_) => true,
            _ => false,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
