//! Storage module for the product catalog
//!
//! This module handles all database operations for the service, including:
//! - SQLite database initialization and schema management
//! - Idempotent product upserts keyed by `(store_id, url)`
//! - Price proximity queries over fresh products
//! - Stale marking, compaction, and ingestion cycle bookkeeping

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteCatalog;
pub use traits::{CatalogStore, StorageError, StorageResult};

use crate::product::{Price, StoreId};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Opens (creating if needed) the catalog database at `path`
pub fn open_catalog(path: &Path) -> StorageResult<SqliteCatalog> {
    SqliteCatalog::open(path)
}

/// Parameters of a price proximity query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProximityQuery {
    pub target: Price,
    pub max_results: u32,

    /// Products last seen before this instant are excluded
    pub fresh_since: DateTime<Utc>,

    /// Only consider products priced at or below `target`
    pub at_or_below_target: bool,
}

/// Counters gathered over one ingestion cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub upserted: u64,
    pub rejected: u64,
    pub failed_pages: u64,
}

/// Represents an ingestion cycle in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleRecord {
    pub id: i64,
    pub store_id: StoreId,
    pub config_hash: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: CycleStatus,
    pub stats: CycleStats,
    pub error_message: Option<String>,
}

/// Status of an ingestion cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl CycleStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}
