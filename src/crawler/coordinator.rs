//! Ingestion cycle coordination
//!
//! This module runs one complete ingestion cycle for one store:
//! - Opening the cycle in the catalog
//! - Driving the source adapter under the cycle timeout
//! - Normalizing and upserting records as they arrive
//! - Pruning products the cycle did not refresh, on success only
//! - Recording the outcome

use crate::crawler::adapter::{AdapterItem, SourceAdapter};
use crate::storage::{CatalogStore, CycleStats, CycleStatus, StorageError};
use crate::AdapterError;
use chrono::{DateTime, TimeZone, Utc};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Items buffered between the adapter and the catalog writer
const CHANNEL_CAPACITY: usize = 64;

/// Settings shared by every cycle of a deployment
#[derive(Debug, Clone)]
pub struct CycleSettings {
    /// Upper bound for one store's whole cycle
    pub cycle_timeout: Duration,

    /// Hash of the configuration the cycle runs under
    pub config_hash: String,
}

/// How one ingestion cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub cycle_id: i64,
    pub status: CycleStatus,
    pub stats: CycleStats,

    /// Products marked stale by the closing prune pass
    pub pruned: u64,

    pub error: Option<String>,
}

impl CycleOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == CycleStatus::Succeeded
    }
}

/// How the adapter half of a cycle ended
enum AdapterEnd {
    Finished,
    Failed(AdapterError),
    Cancelled,
}

/// Runs one ingestion cycle for the adapter's store
///
/// Records are committed as they arrive, so a cycle that times out or is
/// cancelled keeps everything it upserted. Only a cycle that finishes and
/// committed at least one record prunes, using its own start time as the
/// cutoff; a failed cycle leaves the store's previous data untouched.
///
/// # Arguments
///
/// * `adapter` - The store's source adapter
/// * `catalog` - The catalog to write into
/// * `settings` - Cycle timeout and config hash
/// * `cancel` - Cancelled when a newer trigger or shutdown supersedes this cycle
///
/// # Returns
///
/// * `Ok(CycleOutcome)` - The cycle ran to an outcome (which may be a failure)
/// * `Err(StorageError)` - The cycle could not be opened or closed in the catalog
pub async fn run_ingest_cycle(
    adapter: &dyn SourceAdapter,
    catalog: &dyn CatalogStore,
    settings: &CycleSettings,
    cancel: &CancellationToken,
) -> Result<CycleOutcome, StorageError> {
    let store_id = adapter.store_id();
    let cycle_start = now_millis();
    let cycle_id =
        catalog.mark_all_fresh_before_cycle(store_id, cycle_start, &settings.config_hash)?;

    let span = tracing::info_span!("ingest", store = %store_id, cycle = cycle_id);

    async move {
        tracing::info!("Starting ingestion cycle");
        let started = Instant::now();
        let normalizer = adapter.normalizer();
        let (tx, mut rx) = mpsc::channel::<AdapterItem>(CHANNEL_CAPACITY);

        let producer = async move {
            tokio::select! {
                result = tokio::time::timeout(settings.cycle_timeout, adapter.run_cycle(tx)) => {
                    match result {
                        Ok(Ok(())) => AdapterEnd::Finished,
                        Ok(Err(e)) => AdapterEnd::Failed(e),
                        Err(_) => AdapterEnd::Failed(AdapterError::Timeout {
                            elapsed: started.elapsed(),
                        }),
                    }
                }
                _ = cancel.cancelled() => AdapterEnd::Cancelled,
            }
        };

        let normalizer = &normalizer;
        let consumer = async move {
            let mut stats = CycleStats::default();
            while let Some(item) = rx.recv().await {
                match item {
                    AdapterItem::Record(raw) => {
                        let seen_at = now_millis().max(cycle_start);
                        match normalizer.normalize(raw, seen_at) {
                            Ok(product) => {
                                catalog.upsert(&product)?;
                                stats.upserted += 1;
                            }
                            Err(rejected) => {
                                tracing::warn!("{}", rejected);
                                stats.rejected += 1;
                            }
                        }
                    }
                    AdapterItem::PageFailed { url, error } => {
                        tracing::warn!("Page failed {}: {}", url, error);
                        stats.failed_pages += 1;
                    }
                }
            }
            Ok::<_, StorageError>(stats)
        };

        let (adapter_end, consumed) = tokio::join!(producer, consumer);

        let (status, stats, error) = match (adapter_end, consumed) {
            (_, Err(e)) => {
                tracing::error!("Catalog write failed: {}", e);
                (CycleStatus::Failed, CycleStats::default(), Some(e.to_string()))
            }
            (AdapterEnd::Cancelled, Ok(stats)) => (CycleStatus::Cancelled, stats, None),
            (AdapterEnd::Failed(e), Ok(stats)) => {
                (CycleStatus::Failed, stats, Some(e.to_string()))
            }
            (AdapterEnd::Finished, Ok(stats)) if stats.upserted == 0 => (
                CycleStatus::Failed,
                stats,
                Some("cycle produced no records".to_string()),
            ),
            (AdapterEnd::Finished, Ok(stats)) => (CycleStatus::Succeeded, stats, None),
        };

        let pruned = if status == CycleStatus::Succeeded {
            catalog.prune_stale(store_id, cycle_start)?
        } else {
            0
        };

        catalog.finish_cycle(cycle_id, status, &stats, error.as_deref())?;

        match status {
            CycleStatus::Succeeded => tracing::info!(
                "Cycle succeeded in {:?}: {} upserted, {} rejected, {} failed pages, {} pruned",
                started.elapsed(),
                stats.upserted,
                stats.rejected,
                stats.failed_pages,
                pruned
            ),
            CycleStatus::Cancelled => {
                tracing::info!("Cycle cancelled after {} upserts", stats.upserted)
            }
            _ => tracing::error!(
                "Cycle failed after {:?}: {}",
                started.elapsed(),
                error.as_deref().unwrap_or("unknown error")
            ),
        }

        Ok(CycleOutcome {
            cycle_id,
            status,
            stats,
            pruned,
            error,
        })
    }
    .instrument(span)
    .await
}

/// Runs one cycle for every adapter concurrently
///
/// # Returns
///
/// One result per adapter, in input order
pub async fn run_all_once(
    adapters: &[std::sync::Arc<dyn SourceAdapter>],
    catalog: &dyn CatalogStore,
    settings: &CycleSettings,
) -> Vec<Result<CycleOutcome, StorageError>> {
    let cancel = CancellationToken::new();
    let runs = adapters
        .iter()
        .map(|adapter| run_ingest_cycle(adapter.as_ref(), catalog, settings, &cancel));
    futures::future::join_all(runs).await
}

/// Current time truncated to the catalog's millisecond resolution
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_millis_opt(now.timestamp_millis())
        .single()
        .unwrap_or(now)
}
