//! Crawler module for store ingestion
//!
//! This module contains the ingestion pipeline, including:
//! - HTTP fetching and HTML parsing of store pages
//! - Source adapters that crawl one store per cycle
//! - Cycle coordination (normalize, upsert, prune)
//! - Per-store scheduling with backoff and manual triggers

mod adapter;
mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use adapter::{AdapterItem, CrawlLimits, HtmlSourceAdapter, SourceAdapter};
pub use coordinator::{run_all_once, run_ingest_cycle, CycleOutcome, CycleSettings};
pub use fetcher::{build_http_client, fetch_page, FetchedPage};
pub use parser::{parse_page, ExtractedFields, ParsedPage, ProductSelectors};
pub use scheduler::{Scheduler, SchedulerHandle};

use crate::config::Config;
use crate::Result;
use std::sync::Arc;

/// Builds one HTML adapter per enabled store in the configuration
///
/// # Returns
///
/// * `Ok(Vec<...>)` - Adapters in configuration order
/// * `Err(GrocryError)` - A store profile or the HTTP client could not be built
pub fn build_adapters(config: &Config) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    config
        .enabled_profiles()
        .into_iter()
        .map(|profile| {
            let adapter = HtmlSourceAdapter::new(profile, &config.crawler, &config.user_agent)?;
            Ok(Arc::new(adapter) as Arc<dyn SourceAdapter>)
        })
        .collect()
}
