//! Price matching
//!
//! Validates caller input and applies the result-count policy before
//! delegating to the catalog's proximity query. Holds no state of its own.

use crate::config::MatcherConfig;
use crate::product::{Price, Product};
use crate::storage::{CatalogStore, ProximityQuery, StorageError};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by `PriceMatcher::match_price`
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Finds the products priced closest to a target
#[derive(Clone)]
pub struct PriceMatcher {
    catalog: Arc<dyn CatalogStore>,
    config: MatcherConfig,
    staleness_window: Duration,
}

impl PriceMatcher {
    /// Creates a matcher
    ///
    /// # Arguments
    ///
    /// * `catalog` - The catalog to query
    /// * `config` - Result bounds and filtering policy
    /// * `staleness_window` - Products last seen longer ago than this are never returned
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        config: MatcherConfig,
        staleness_window: Duration,
    ) -> Self {
        Self {
            catalog,
            config,
            staleness_window,
        }
    }

    /// Result count used when the caller gives none
    pub fn default_max_results(&self) -> u32 {
        self.config.default_max_results
    }

    /// Returns up to `max_results` fresh products ordered by distance from `target`
    ///
    /// Ties are broken by the most recent `last_seen_at`, then by
    /// `(store_id, url)`.
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` - `target` is not positive, or `max_results` is
    ///   outside `1..=max-results-upper-bound`
    /// * `Storage` - The catalog could not be read
    pub fn match_price(&self, target: Price, max_results: u32) -> Result<Vec<Product>, MatchError> {
        if target <= Price::ZERO {
            return Err(MatchError::InvalidArgument(format!(
                "price must be greater than 0, got {}",
                target
            )));
        }

        let upper = self.config.max_results_upper_bound;
        if max_results == 0 || max_results > upper {
            return Err(MatchError::InvalidArgument(format!(
                "max_products must be between 1 and {}, got {}",
                upper, max_results
            )));
        }

        let window = chrono::Duration::from_std(self.staleness_window)
            .unwrap_or_else(|_| chrono::Duration::zero());

        let query = ProximityQuery {
            target,
            max_results,
            fresh_since: Utc::now() - window,
            at_or_below_target: self.config.at_or_below_target,
        };

        Ok(self.catalog.query_by_price_proximity(&query)?)
    }
}
