//! Built-in crawl recipes for the supported stores
//!
//! Each `[[store]]` entry in the configuration only needs an `id`; every
//! field it leaves out is taken from the profile defined here.

use crate::config::types::{StoreEntry, StoreProfile};
use crate::product::StoreId;

const BASE_NAME_SELECTORS: &[&str] = &[
    "h1",
    ".product-title",
    "[data-testid='product-title']",
    ".product-name",
    ".product-header h1",
    ".product-details h1",
    ".product-info h1",
];

const BASE_PRICE_SELECTORS: &[&str] = &[
    ".price",
    ".product-price",
    "[data-testid='price']",
    ".price-value",
    "span[class*='price']",
    ".product-price span",
    ".price-display",
    ".product-cost",
];

const ALBERTSONS_FOLLOW: &[&str] = &["*shop/aisles/*", "*shop/product/*", "*product/*", "*pdp/*"];

const ALBERTSONS_PRODUCT: &[&str] = &[
    "*/shop/product/*",
    "*/product/*",
    "*/pdp/*",
    "*/item/*",
    "*/detail/*",
];

const ALBERTSONS_PRICE_EXTRA: &[&str] = &[
    ".price-current",
    ".price-sale",
    ".price-regular",
    ".price-amount",
];

/// Returns the built-in profile for a store
pub fn builtin_profile(store_id: StoreId) -> StoreProfile {
    match store_id {
        StoreId::TraderJoes => StoreProfile {
            store_id,
            seeds: strings(&["https://www.traderjoes.com/home/products/category/food-8"]),
            domain: "*.traderjoes.com".to_string(),
            follow_patterns: strings(&["*products/category/*", "*products/pdp/*"]),
            product_patterns: strings(&["*/home/products/pdp/*"]),
            name_selector: selector_list(BASE_NAME_SELECTORS, &[]),
            price_selector: selector_list(BASE_PRICE_SELECTORS, &[]),
            category_selector: None,
            category_path_prefix: Some("/home/products/category/".to_string()),
            respect_robots: true,
        },
        StoreId::Safeway => StoreProfile {
            store_id,
            seeds: strings(&[
                "https://www.safeway.com/shop/aisles/frozen-foods/ice-cream-novelties.html",
            ]),
            domain: "*.safeway.com".to_string(),
            follow_patterns: strings(ALBERTSONS_FOLLOW),
            product_patterns: strings(ALBERTSONS_PRODUCT),
            name_selector: selector_list(
                BASE_NAME_SELECTORS,
                &[".product-detail-title", ".item-name"],
            ),
            price_selector: selector_list(BASE_PRICE_SELECTORS, ALBERTSONS_PRICE_EXTRA),
            category_selector: None,
            category_path_prefix: Some("/shop/aisles/".to_string()),
            respect_robots: true,
        },
        StoreId::StarMarket => StoreProfile {
            store_id,
            seeds: strings(&[
                "https://www.starmarket.com/shop/aisles/frozen-foods/ice-cream-novelties.html",
            ]),
            domain: "*.starmarket.com".to_string(),
            follow_patterns: strings(ALBERTSONS_FOLLOW),
            product_patterns: strings(ALBERTSONS_PRODUCT),
            name_selector: selector_list(BASE_NAME_SELECTORS, &[]),
            price_selector: selector_list(BASE_PRICE_SELECTORS, ALBERTSONS_PRICE_EXTRA),
            category_selector: None,
            category_path_prefix: Some("/shop/aisles/".to_string()),
            respect_robots: true,
        },
        StoreId::StopAndShop => StoreProfile {
            store_id,
            seeds: strings(&["https://stopandshop.com/departments/produce"]),
            domain: "*.stopandshop.com".to_string(),
            follow_patterns: strings(&[
                "*/product/*",
                "*/products/*",
                "*/category/*",
                "*/departments/*",
                "*/browse/*",
            ]),
            product_patterns: strings(&["*/product/*"]),
            name_selector: selector_list(
                BASE_NAME_SELECTORS,
                &[".pdp-product-name", ".kds-Text--l"],
            ),
            price_selector: selector_list(
                BASE_PRICE_SELECTORS,
                &[".current-price", ".sale-price", ".kds-Price"],
            ),
            category_selector: None,
            category_path_prefix: Some("/departments/".to_string()),
            respect_robots: true,
        },
    }
}

/// Resolves a configuration entry against its store's built-in profile
///
/// # Arguments
///
/// * `entry` - The `[[store]]` entry from the configuration file
///
/// # Returns
///
/// The built-in profile with every field the entry sets replaced
pub fn resolve_profile(entry: &StoreEntry) -> StoreProfile {
    let mut profile = builtin_profile(entry.id);

    if !entry.seeds.is_empty() {
        profile.seeds = entry.seeds.clone();
    }
    if let Some(domain) = &entry.domain {
        profile.domain = domain.clone();
    }
    if let Some(patterns) = &entry.follow_patterns {
        profile.follow_patterns = patterns.clone();
    }
    if let Some(patterns) = &entry.product_patterns {
        profile.product_patterns = patterns.clone();
    }
    if let Some(selector) = &entry.name_selector {
        profile.name_selector = selector.clone();
    }
    if let Some(selector) = &entry.price_selector {
        profile.price_selector = selector.clone();
    }
    if entry.category_selector.is_some() {
        profile.category_selector = entry.category_selector.clone();
    }
    if entry.category_path_prefix.is_some() {
        profile.category_path_prefix = entry.category_path_prefix.clone();
    }
    if let Some(respect) = entry.respect_robots {
        profile.respect_robots = respect;
    }

    profile
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn selector_list(base: &[&str], extra: &[&str]) -> String {
    base.iter().chain(extra).copied().collect::<Vec<_>>().join(", ")
}
