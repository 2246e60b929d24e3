//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the CatalogStore
//! trait. The database runs in WAL mode with one writer connection and one
//! reader connection, so price queries proceed while a cycle is upserting.

use crate::product::{Price, Product, StoreId};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CatalogStore, StorageError, StorageResult};
use crate::storage::{CycleRecord, CycleStats, CycleStatus, ProximityQuery};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite catalog backend
pub struct SqliteCatalog {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Opens or creates the catalog database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteCatalog)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        let writer = Connection::open(path).map_err(|e| {
            StorageError::Unavailable(format!("cannot open {}: {}", path.display(), e))
        })?;
        writer.busy_timeout(BUSY_TIMEOUT)?;
        writer.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_schema(&writer)?;

        let reader = Connection::open(path).map_err(|e| {
            StorageError::Unavailable(format!("cannot open {}: {}", path.display(), e))
        })?;
        reader.busy_timeout(BUSY_TIMEOUT)?;
        reader.execute_batch("PRAGMA query_only = ON;")?;

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    fn writer(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.writer.lock().map_err(|_| StorageError::Poisoned)
    }

    fn reader(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.reader.lock().map_err(|_| StorageError::Poisoned)
    }
}

/// A products row as stored, before its columns are checked
struct ProductRow {
    store_id: String,
    url: String,
    name: String,
    price_cents: i64,
    category: Option<String>,
    last_seen_at: i64,
}

const PRODUCT_COLUMNS: &str = "store_id, url, name, price_cents, category, last_seen_at";

impl ProductRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            store_id: row.get(0)?,
            url: row.get(1)?,
            name: row.get(2)?,
            price_cents: row.get(3)?,
            category: row.get(4)?,
            last_seen_at: row.get(5)?,
        })
    }

    fn into_product(self) -> StorageResult<Product> {
        let store_id = StoreId::from_db_string(&self.store_id)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown store '{}'", self.store_id)))?;

        Ok(Product {
            store_id,
            url: self.url,
            name: self.name,
            price: Price::from_minor_units(self.price_cents),
            category: self.category,
            last_seen_at: from_millis(self.last_seen_at)?,
        })
    }
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> StorageResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StorageError::Corrupt(format!("timestamp {} out of range", ms)))
}

impl CatalogStore for SqliteCatalog {
    // ===== Products =====

    fn upsert(&self, product: &Product) -> StorageResult<bool> {
        let conn = self.writer()?;
        let changed = conn.execute(
            "INSERT INTO products (store_id, url, name, price_cents, category, last_seen_at, stale)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)
             ON CONFLICT(store_id, url) DO UPDATE SET
                name = excluded.name,
                price_cents = excluded.price_cents,
                category = excluded.category,
                last_seen_at = excluded.last_seen_at,
                stale = 0
             WHERE excluded.last_seen_at >= products.last_seen_at",
            params![
                product.store_id.to_db_string(),
                product.url,
                product.name,
                product.price.minor_units(),
                product.category,
                to_millis(product.last_seen_at),
            ],
        )?;
        Ok(changed > 0)
    }

    fn get_product(&self, store_id: StoreId, url: &str) -> StorageResult<Option<Product>> {
        let conn = self.reader()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM products WHERE store_id = ?1 AND url = ?2",
                    PRODUCT_COLUMNS
                ),
                params![store_id.to_db_string(), url],
                ProductRow::from_row,
            )
            .optional()?;

        row.map(ProductRow::into_product).transpose()
    }

    fn query_by_price_proximity(&self, query: &ProximityQuery) -> StorageResult<Vec<Product>> {
        let target = query.target.minor_units();
        let ceiling = if query.at_or_below_target {
            target
        } else {
            i64::MAX
        };

        let conn = self.reader()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {}
             FROM products
             WHERE stale = 0 AND last_seen_at >= ?2 AND price_cents <= ?3
             ORDER BY ABS(price_cents - ?1) ASC, last_seen_at DESC, store_id ASC, url ASC
             LIMIT ?4",
            PRODUCT_COLUMNS
        ))?;

        let rows = stmt
            .query_map(
                params![
                    target,
                    to_millis(query.fresh_since),
                    ceiling,
                    i64::from(query.max_results)
                ],
                ProductRow::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(ProductRow::into_product).collect()
    }

    // ===== Cycle bookkeeping and aging =====

    fn mark_all_fresh_before_cycle(
        &self,
        store_id: StoreId,
        cycle_start: DateTime<Utc>,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let conn = self.writer()?;
        conn.execute(
            "INSERT INTO cycles (store_id, config_hash, started_at, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                store_id.to_db_string(),
                config_hash,
                to_millis(cycle_start),
                CycleStatus::Running.to_db_string()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn finish_cycle(
        &self,
        cycle_id: i64,
        status: CycleStatus,
        stats: &CycleStats,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let conn = self.writer()?;
        conn.execute(
            "UPDATE cycles
             SET status = ?1, finished_at = ?2, upserted = ?3, rejected = ?4,
                 failed_pages = ?5, error_message = ?6
             WHERE id = ?7",
            params![
                status.to_db_string(),
                to_millis(Utc::now()),
                stats.upserted as i64,
                stats.rejected as i64,
                stats.failed_pages as i64,
                error_message,
                cycle_id
            ],
        )?;
        Ok(())
    }

    fn prune_stale(&self, store_id: StoreId, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        let conn = self.writer()?;
        let marked = conn.execute(
            "UPDATE products SET stale = 1
             WHERE store_id = ?1 AND last_seen_at < ?2 AND stale = 0",
            params![store_id.to_db_string(), to_millis(cutoff)],
        )?;
        Ok(marked as u64)
    }

    fn compact(&self, older_than: DateTime<Utc>) -> StorageResult<u64> {
        let conn = self.writer()?;
        let deleted = conn.execute(
            "DELETE FROM products WHERE stale = 1 OR last_seen_at < ?1",
            params![to_millis(older_than)],
        )?;
        Ok(deleted as u64)
    }

    // ===== Health and statistics =====

    fn health_check(&self) -> StorageResult<()> {
        let conn = self.reader()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(())
    }

    fn count_products(&self) -> StorageResult<u64> {
        let conn = self.reader()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM products WHERE stale = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_by_store(&self) -> StorageResult<Vec<(StoreId, u64)>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare(
            "SELECT store_id, COUNT(*) FROM products WHERE stale = 0
             GROUP BY store_id ORDER BY store_id",
        )?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(store, count)| {
                StoreId::from_db_string(&store)
                    .map(|id| (id, count as u64))
                    .ok_or_else(|| StorageError::Corrupt(format!("unknown store '{}'", store)))
            })
            .collect()
    }

    fn latest_cycle(&self, store_id: StoreId) -> StorageResult<Option<CycleRecord>> {
        let conn = self.reader()?;
        let row = conn
            .query_row(
                "SELECT id, config_hash, started_at, finished_at, status,
                        upserted, rejected, failed_pages, error_message
                 FROM cycles WHERE store_id = ?1 ORDER BY id DESC LIMIT 1",
                params![store_id.to_db_string()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                        row.get::<_, String>(4)?,
                        CycleStats {
                            upserted: row.get::<_, i64>(5)? as u64,
                            rejected: row.get::<_, i64>(6)? as u64,
                            failed_pages: row.get::<_, i64>(7)? as u64,
                        },
                        row.get::<_, Option<String>>(8)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, config_hash, started_at, finished_at, status, stats, error_message)) = row
        else {
            return Ok(None);
        };

        let status = CycleStatus::from_db_string(&status)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown cycle status '{}'", status)))?;

        Ok(Some(CycleRecord {
            id,
            store_id,
            config_hash,
            started_at: from_millis(started_at)?,
            finished_at: finished_at.map(from_millis).transpose()?,
            status,
            stats,
            error_message,
        }))
    }
}
