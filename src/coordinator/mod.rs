//! Fleet membership and leader election
//!
//! There is no coordinator process. Every node writes its own row in the
//! shared store and the rows themselves are the membership list.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │           NodeRegistry              │
//! │                                     │
//! │  heartbeat (every H)                │
//! │   ├─ touch own row / re-create      │
//! │   └─ election round                 │
//! │        ├─ healthy leader → done     │
//! │        ├─ stale leader → demote     │
//! │        └─ CAS-promote oldest live   │
//! │                                     │
//! │  sweep (every S)                    │
//! │   └─ ACTIVE ∧ stale → OFFLINE       │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use fleetcrawl::coordinator::{ClusterConfig, NodeRegistry};
//!
//! let registry = Arc::new(NodeRegistry::new(store, &ClusterConfig::default()));
//! registry.register()?;
//! let handle = registry.clone().start_heartbeat(interval, shutdown_rx);
//! ```

pub mod config;
pub mod election;
pub mod registry;

// Re-export main types
pub use config::{ClusterConfig, ConfigError};
pub use election::{run_election, ElectionOutcome};
pub use registry::{ClusterStats, NodeRegistry};
