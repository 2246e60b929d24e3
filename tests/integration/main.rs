//! Integration tests for Grocry
//!
//! These tests use wiremock to stand in for store websites and drive the
//! ingestion pipeline, scheduler and HTTP API end-to-end.

mod common;
mod ingest_tests;
mod service_tests;
