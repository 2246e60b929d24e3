//! Storage traits and error types
//!
//! This module defines the trait interface for catalog backends and
//! associated error types.

use crate::product::{Product, StoreId};
use crate::storage::{CycleRecord, CycleStats, CycleStatus, ProximityQuery};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Catalog connection lock poisoned")]
    Poisoned,

    #[error("Corrupt catalog row: {0}")]
    Corrupt(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for catalog backend implementations
///
/// Implementations must be safe to share between the ingestion workers
/// (writers) and the API layer (readers). Reads never observe a partially
/// written product: every upsert replaces a whole row atomically.
pub trait CatalogStore: Send + Sync {
    // ===== Products =====

    /// Inserts or updates a product keyed by `(store_id, url)`
    ///
    /// Last write wins by `last_seen_at`: an upsert carrying an older
    /// timestamp than the stored row is ignored. Upserting also clears the
    /// stale mark.
    ///
    /// # Returns
    ///
    /// `true` if the stored row now reflects `product`
    fn upsert(&self, product: &Product) -> StorageResult<bool>;

    /// Gets a single product by key, stale or not
    fn get_product(&self, store_id: StoreId, url: &str) -> StorageResult<Option<Product>>;

    /// Returns the fresh products closest in price to the query target
    ///
    /// Ordered by ascending absolute price difference, then most recent
    /// `last_seen_at`, then `(store_id, url)`.
    fn query_by_price_proximity(&self, query: &ProximityQuery) -> StorageResult<Vec<Product>>;

    // ===== Cycle bookkeeping and aging =====

    /// Opens a cycle for `store_id` starting at `cycle_start`
    ///
    /// Every product the cycle refreshes ends up with `last_seen_at >=
    /// cycle_start`; anything older is a candidate for `prune_stale` once
    /// the cycle succeeds.
    ///
    /// # Returns
    ///
    /// The ID of the new cycle row
    fn mark_all_fresh_before_cycle(
        &self,
        store_id: StoreId,
        cycle_start: DateTime<Utc>,
        config_hash: &str,
    ) -> StorageResult<i64>;

    /// Closes a cycle with its outcome
    fn finish_cycle(
        &self,
        cycle_id: i64,
        status: CycleStatus,
        stats: &CycleStats,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    /// Marks products of `store_id` last seen before `cutoff` as stale
    ///
    /// # Returns
    ///
    /// The number of products newly marked
    fn prune_stale(&self, store_id: StoreId, cutoff: DateTime<Utc>) -> StorageResult<u64>;

    /// Physically deletes stale products and products last seen before `older_than`
    fn compact(&self, older_than: DateTime<Utc>) -> StorageResult<u64>;

    // ===== Health and statistics =====

    /// Verifies the catalog can serve reads
    fn health_check(&self) -> StorageResult<()>;

    /// Counts products that are not marked stale
    fn count_products(&self) -> StorageResult<u64>;

    /// Counts non-stale products per store
    fn count_by_store(&self) -> StorageResult<Vec<(StoreId, u64)>>;

    /// Gets the most recent cycle of a store
    fn latest_cycle(&self, store_id: StoreId) -> StorageResult<Option<CycleRecord>>;
}
