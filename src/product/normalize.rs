//! Raw record normalization
//!
//! Converts what a source adapter scraped off a page into a canonical
//! `Product`, or explains why the record had to be dropped.

use crate::product::{Price, PriceError, Product, StoreId};
use crate::url::normalize_url;
use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

/// A record as extracted from a store page, before any cleanup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub store_id: StoreId,

    /// Product name text as scraped
    pub name: String,

    /// Price text as scraped (e.g. "$3.49 /each")
    pub price: String,

    /// Product URL, possibly relative to `page_url`
    pub url: String,

    /// The page the record was extracted from
    pub page_url: String,

    /// Category text found on the page (breadcrumb or label)
    pub category_hint: Option<String>,

    /// The listing page that linked to `page_url`
    pub referrer: Option<String>,
}

/// Why a raw record was not turned into a product
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("name is empty after trimming")]
    EmptyName,

    #[error("invalid price: {0}")]
    InvalidPrice(#[from] PriceError),

    #[error("negative price {0}")]
    NegativePrice(Price),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// A raw record the normalizer refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rejected record from {url}: {reason}")]
pub struct RejectedRecord {
    pub url: String,
    pub reason: RejectReason,
}

/// Per-store normalization rules
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    category_path_prefix: Option<String>,
}

impl Normalizer {
    /// Creates a normalizer
    ///
    /// # Arguments
    ///
    /// * `category_path_prefix` - Path prefix of the store's category
    ///   listings (e.g. `"/shop/aisles/"`), used to derive a category from
    ///   the referring page when the product page carries none
    pub fn new(category_path_prefix: Option<String>) -> Self {
        Self {
            category_path_prefix,
        }
    }

    /// Normalizes a raw record observed at `seen_at`
    pub fn normalize(
        &self,
        raw: RawRecord,
        seen_at: DateTime<Utc>,
    ) -> Result<Product, RejectedRecord> {
        let reject = |reason: RejectReason| RejectedRecord {
            url: raw.url.clone(),
            reason,
        };

        let name = collapse_whitespace(&raw.name);
        if name.is_empty() {
            return Err(reject(RejectReason::EmptyName));
        }

        let price = Price::parse(&raw.price).map_err(|e| reject(e.into()))?;
        if price.is_negative() {
            return Err(reject(RejectReason::NegativePrice(price)));
        }

        let url = absolute_url(&raw.url, &raw.page_url)
            .ok_or_else(|| reject(RejectReason::InvalidUrl(raw.url.clone())))?;

        let category = raw
            .category_hint
            .as_deref()
            .map(collapse_whitespace)
            .filter(|c| !c.is_empty())
            .or_else(|| {
                let prefix = self.category_path_prefix.as_deref()?;
                let referrer = raw.referrer.as_deref()?;
                derive_category(referrer, prefix)
            });

        Ok(Product {
            store_id: raw.store_id,
            url,
            name,
            price,
            category,
            last_seen_at: seen_at,
        })
    }
}

/// Derives a display category from a listing URL
///
/// Takes the path segment immediately after `prefix`, drops an `.html`
/// suffix and a trailing numeric id, and title-cases the words:
/// `/home/products/category/food-8` with prefix `/home/products/category/`
/// becomes `Food`; `/shop/aisles/frozen-foods/ice-cream.html` with prefix
/// `/shop/aisles/` becomes `Frozen Foods`.
///
/// Returns None when the URL does not sit under `prefix`.
pub fn derive_category(listing_url: &str, prefix: &str) -> Option<String> {
    let url = Url::parse(listing_url).ok()?;
    let rest = url.path().strip_prefix(prefix)?;
    let segment = rest.split('/').next()?;
    let segment = segment.strip_suffix(".html").unwrap_or(segment);

    let mut words: Vec<&str> = segment
        .split(|c| c == '-' || c == '_')
        .filter(|w| !w.is_empty())
        .collect();

    // "food-8": the numeric tail is a site id, not part of the name
    if words.len() > 1 && words.last().map_or(false, |w| w.bytes().all(|b| b.is_ascii_digit())) {
        words.pop();
    }

    let label = words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn absolute_url(href: &str, page_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let base = Url::parse(page_url).ok();
    let joined = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };

    normalize_url(joined.as_str()).ok().map(|u| u.to_string())
}
