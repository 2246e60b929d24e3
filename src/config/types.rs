use crate::product::StoreId;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Grocry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default, rename = "store")]
    pub stores: Vec<StoreEntry>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Socket address the API listens on
    pub bind_address: String,

    /// CORS origins; `*` allows any origin
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// Crawl behavior, applied to every store
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of pages fetched at once for one store
    pub max_concurrent_pages: u32,

    /// Timeout for a single page fetch (seconds)
    pub page_timeout_secs: u64,

    /// Timeout for a complete crawl cycle of one store (seconds)
    pub cycle_timeout_secs: u64,

    /// Pause between request batches to the same store (milliseconds)
    pub minimum_time_on_page: u64,

    /// Maximum pages visited per cycle
    pub max_pages: u32,

    /// Maximum link depth from the seed pages
    pub max_depth: u32,
}

impl CrawlerConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.minimum_time_on_page)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_pages: 5,
            page_timeout_secs: 30,
            cycle_timeout_secs: 900,
            minimum_time_on_page: 250,
            max_pages: 200,
            max_depth: 3,
        }
    }
}

/// Ingestion scheduling and retry policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScheduleConfig {
    /// Time between successful cycles of one store (seconds)
    pub interval_secs: u64,

    /// First retry delay after a failed cycle (seconds)
    pub retry_base_secs: u64,

    /// Upper bound for the doubling retry delay (seconds)
    pub retry_max_secs: u64,

    /// Consecutive failures after which a store is reported degraded
    pub degraded_after_failures: u32,

    /// Whether every store crawls immediately at startup
    pub run_on_startup: bool,
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retry_base(&self) -> Duration {
        Duration::from_secs(self.retry_base_secs)
    }

    pub fn retry_max(&self) -> Duration {
        Duration::from_secs(self.retry_max_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 6 * 60 * 60,
            retry_base_secs: 60,
            retry_max_secs: 60 * 60,
            degraded_after_failures: 3,
            run_on_startup: true,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Catalog storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CatalogConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Age after which an unrefreshed product stops being returned (seconds)
    pub staleness_window_secs: u64,

    /// How often stale rows are physically deleted (seconds)
    pub compaction_interval_secs: u64,
}

impl CatalogConfig {
    pub fn staleness_window(&self) -> Duration {
        Duration::from_secs(self.staleness_window_secs)
    }

    pub fn compaction_interval(&self) -> Duration {
        Duration::from_secs(self.compaction_interval_secs)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_path: "./grocry.db".to_string(),
            staleness_window_secs: 48 * 60 * 60,
            compaction_interval_secs: 60 * 60,
        }
    }
}

/// Price matching limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MatcherConfig {
    /// Largest `max_products` a caller may request
    pub max_results_upper_bound: u32,

    /// `max_products` used when the caller gives none
    pub default_max_results: u32,

    /// Only consider products priced at or below the target
    pub at_or_below_target: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_results_upper_bound: 100,
            default_max_results: 10,
            at_or_below_target: false,
        }
    }
}

/// One `[[store]]` entry; omitted fields fall back to the built-in profile
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StoreEntry {
    pub id: StoreId,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub seeds: Vec<String>,

    pub domain: Option<String>,
    pub follow_patterns: Option<Vec<String>>,
    pub product_patterns: Option<Vec<String>>,
    pub name_selector: Option<String>,
    pub price_selector: Option<String>,
    pub category_selector: Option<String>,
    pub category_path_prefix: Option<String>,
    pub respect_robots: Option<bool>,
}

impl StoreEntry {
    /// An entry that takes everything from the built-in profile
    pub fn builtin(id: StoreId) -> Self {
        Self {
            id,
            enabled: true,
            seeds: Vec::new(),
            domain: None,
            follow_patterns: None,
            product_patterns: None,
            name_selector: None,
            price_selector: None,
            category_selector: None,
            category_path_prefix: None,
            respect_robots: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Fully resolved crawl recipe for one store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreProfile {
    pub store_id: StoreId,

    /// Pages the crawl starts from
    pub seeds: Vec<String>,

    /// Wildcard host pattern the crawl may not leave
    pub domain: String,

    /// URL globs of pages whose links are followed
    pub follow_patterns: Vec<String>,

    /// URL globs of product detail pages
    pub product_patterns: Vec<String>,

    /// CSS selector list for the product name
    pub name_selector: String,

    /// CSS selector list for the product price
    pub price_selector: String,

    /// CSS selector list for a category label, if the site shows one
    pub category_selector: Option<String>,

    /// Path prefix of category listings, for deriving categories from URLs
    pub category_path_prefix: Option<String>,

    pub respect_robots: bool,
}
