//! Canonical product records
//!
//! This module defines the normalized shape every store's catalog entry is
//! reduced to, along with its identity key and the fixed set of stores the
//! service knows how to crawl.
//!
//! # Components
//!
//! - `StoreId`: The enumerated set of supported stores
//! - `Product`: A canonical, deduplicated catalog entry
//! - `Price`: Fixed-point currency amount in minor units
//! - `Normalizer`: Raw adapter output -> `Product` or `RejectedRecord`

mod normalize;
mod price;

pub use normalize::{derive_category, Normalizer, RawRecord, RejectReason, RejectedRecord};
pub use price::{Price, PriceError};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// The stores this service crawls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreId {
    TraderJoes,
    Safeway,
    StarMarket,
    StopAndShop,
}

impl StoreId {
    /// Converts the store id to its stable string form
    ///
    /// This is used as the database key and in configuration files.
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::TraderJoes => "trader-joes",
            Self::Safeway => "safeway",
            Self::StarMarket => "star-market",
            Self::StopAndShop => "stop-and-shop",
        }
    }

    /// Parses a store id from its stable string form
    ///
    /// Returns None if the string doesn't match any known store.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "trader-joes" => Some(Self::TraderJoes),
            "safeway" => Some(Self::Safeway),
            "star-market" => Some(Self::StarMarket),
            "stop-and-shop" => Some(Self::StopAndShop),
            _ => None,
        }
    }

    /// Returns all known stores
    pub fn all() -> Vec<Self> {
        vec![
            Self::TraderJoes,
            Self::Safeway,
            Self::StarMarket,
            Self::StopAndShop,
        ]
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

impl FromStr for StoreId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_string(s).ok_or_else(|| format!("unknown store id '{}'", s))
    }
}

/// Identity of a product: one URL within one store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductKey {
    pub store_id: StoreId,
    pub url: String,
}

/// A canonical product record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Store the product was crawled from
    pub store_id: StoreId,

    /// Absolute, normalized product URL (unique per store)
    pub url: String,

    /// Trimmed, non-empty display name
    pub name: String,

    /// Non-negative price in minor units
    pub price: Price,

    /// Category when one could be determined; never a placeholder
    pub category: Option<String>,

    /// When the product was last observed by a crawl
    pub last_seen_at: DateTime<Utc>,
}

impl Product {
    /// Returns the `(store_id, url)` identity of this product
    pub fn key(&self) -> ProductKey {
        ProductKey {
            store_id: self.store_id,
            url: self.url.clone(),
        }
    }
}
