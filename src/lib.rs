//! Grocry: grocery price crawling and price-proximity matching
//!
//! This crate continuously crawls store websites, normalizes what it finds
//! into canonical product records, keeps them in a durable catalog, and
//! answers "closest price to target" queries over HTTP.

pub mod api;
pub mod config;
pub mod crawler;
pub mod matcher;
pub mod product;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use std::time::Duration;
use thiserror::Error;

/// Main error type for Grocry operations
#[derive(Debug, Error)]
pub enum GrocryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Crawl error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Errors a source adapter reports for a page or a whole cycle
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Unrecognized page layout at {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Crawl cycle timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Grocry operations
pub type Result<T> = std::result::Result<T, GrocryError>;

// Re-export commonly used types
pub use config::Config;
pub use matcher::{MatchError, PriceMatcher};
pub use product::{Price, Product, StoreId};
pub use state::IngestState;
pub use storage::{CatalogStore, SqliteCatalog};
