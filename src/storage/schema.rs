//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Grocry catalog.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Canonical products, one row per (store, url)
CREATE TABLE IF NOT EXISTS products (
    store_id TEXT NOT NULL,
    url TEXT NOT NULL,
    name TEXT NOT NULL,
    price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
    category TEXT,
    last_seen_at INTEGER NOT NULL,
    stale INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (store_id, url)
);

CREATE INDEX IF NOT EXISTS idx_products_fresh ON products(stale, last_seen_at);
CREATE INDEX IF NOT EXISTS idx_products_price ON products(price_cents);

-- One row per ingestion cycle
CREATE TABLE IF NOT EXISTS cycles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    store_id TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    started_at INTEGER NOT NULL,
    finished_at INTEGER,
    status TEXT NOT NULL,
    upserted INTEGER NOT NULL DEFAULT 0,
    rejected INTEGER NOT NULL DEFAULT 0,
    failed_pages INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_cycles_store ON cycles(store_id, id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
