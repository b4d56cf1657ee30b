//! Integration tests module
//!
//! End-to-end tests for the crawler fleet:
//! - Submit, schedule, fetch, expand and complete a job
//! - Election, sweep and leadership handover
//! - Failure paths: HTTP errors, transport errors, duplicates, dead nodes

pub mod crawl_flow_test;
pub mod election_test;
pub mod error_scenarios;
pub mod fixtures;
