//! State module for tracking ingestion progress
//!
//! This module provides the per-store state machine driven by the
//! ingestion scheduler, plus the schedule metadata (failure count, next
//! run time) that backs retries and the health check.
//!
//! # Components
//!
//! - `IngestState`: `Idle -> Running -> {Succeeded, Failed} -> Idle`
//! - `StoreSchedule`: Per-store schedule metadata and backoff policy
//! - `StoreHealth`: Point-in-time snapshot reported to the API layer

mod ingest_state;
mod schedule;

pub use ingest_state::IngestState;
pub use schedule::{backoff_delay, StoreHealth, StoreSchedule};
