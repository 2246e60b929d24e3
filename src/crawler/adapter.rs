//! Source adapters
//!
//! A source adapter performs one crawl cycle for one store and streams what
//! it finds into a channel: raw product records, and per-page failures that
//! did not stop the cycle.

use crate::config::{CrawlerConfig, StoreProfile, UserAgentConfig};
use crate::crawler::fetcher::{build_http_client, fetch_page};
use crate::crawler::parser::{parse_page, ExtractedFields, ProductSelectors};
use crate::product::{Normalizer, RawRecord, StoreId};
use crate::robots::{fetch_robots, RobotsPolicy};
use crate::url::{is_within_domain, matches_glob, normalize_url};
use crate::{AdapterError, GrocryError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

/// One item produced during a crawl cycle
#[derive(Debug, Clone)]
pub enum AdapterItem {
    /// A product record extracted from a page
    Record(RawRecord),

    /// A page that could not be fetched or parsed
    PageFailed { url: String, error: AdapterError },
}

/// Crawls one store
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// The store this adapter crawls
    fn store_id(&self) -> StoreId;

    /// Normalization rules for this store's records
    fn normalizer(&self) -> Normalizer {
        Normalizer::default()
    }

    /// Performs one crawl cycle, sending items to `sink` as they are found
    ///
    /// Page-level failures are reported through the sink and never end the
    /// cycle early. The cycle stops without error if the receiving end of
    /// `sink` is dropped.
    async fn run_cycle(&self, sink: mpsc::Sender<AdapterItem>) -> Result<(), AdapterError>;
}

/// Crawl bounds applied by `HtmlSourceAdapter`
#[derive(Debug, Clone)]
pub struct CrawlLimits {
    pub max_depth: u32,
    pub max_pages: u32,
    pub max_concurrent_pages: usize,
    pub politeness_delay: Duration,
}

impl From<&CrawlerConfig> for CrawlLimits {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_pages: config.max_pages,
            max_concurrent_pages: config.max_concurrent_pages.max(1) as usize,
            politeness_delay: config.politeness_delay(),
        }
    }
}

/// A page waiting to be fetched
#[derive(Debug, Clone)]
struct FrontierEntry {
    url: Url,
    referrer: Option<String>,
}

/// Breadth-first crawler driven by a store profile
pub struct HtmlSourceAdapter {
    profile: StoreProfile,
    selectors: ProductSelectors,
    limits: CrawlLimits,
    client: Client,
    agent: String,
}

impl HtmlSourceAdapter {
    /// Creates an adapter for a resolved store profile
    ///
    /// # Arguments
    ///
    /// * `profile` - The store's crawl recipe
    /// * `crawler` - Crawl bounds and timeouts
    /// * `user_agent` - Identification sent with every request
    pub fn new(
        profile: StoreProfile,
        crawler: &CrawlerConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, GrocryError> {
        let selectors = ProductSelectors::compile(&profile)?;
        let client = build_http_client(user_agent, crawler.page_timeout())?;

        Ok(Self {
            profile,
            selectors,
            limits: CrawlLimits::from(crawler),
            client,
            agent: user_agent.crawler_name.clone(),
        })
    }

    fn is_product_page(&self, url: &Url) -> bool {
        self.profile
            .product_patterns
            .iter()
            .any(|pattern| matches_glob(pattern, url.as_str()))
    }

    fn should_follow(&self, url: &Url) -> bool {
        is_within_domain(url, &self.profile.domain)
            && (self.is_product_page(url)
                || self
                    .profile
                    .follow_patterns
                    .iter()
                    .any(|pattern| matches_glob(pattern, url.as_str())))
    }

    async fn load_robots(&self) -> RobotsPolicy {
        if !self.profile.respect_robots {
            return RobotsPolicy::allow_all(&self.agent);
        }

        match self.profile.seeds.first().and_then(|s| Url::parse(s).ok()) {
            Some(seed) => fetch_robots(&self.client, &seed, &self.agent).await,
            None => RobotsPolicy::allow_all(&self.agent),
        }
    }

    /// Fetches and parses one page, after which the slot rests for the delay
    async fn visit(&self, entry: &FrontierEntry, delay: Duration) -> Result<Visited, AdapterError> {
        let is_product = self.is_product_page(&entry.url);
        let fetched = fetch_page(&self.client, &entry.url).await;
        tokio::time::sleep(delay).await;
        let fetched = fetched?;

        let selectors = is_product.then_some(&self.selectors);
        let parsed = parse_page(&fetched.body, &fetched.final_url, selectors);

        Ok(Visited {
            page_url: fetched.final_url,
            links: parsed.links,
            product: parsed.product,
        })
    }

    fn to_record(
        &self,
        page_url: &Url,
        referrer: Option<String>,
        fields: ExtractedFields,
    ) -> Result<RawRecord, AdapterError> {
        let parse_error = |message: &str| AdapterError::Parse {
            url: page_url.to_string(),
            message: message.to_string(),
        };

        let name = fields.name.ok_or_else(|| parse_error("no product name found"))?;
        let price = fields.price.ok_or_else(|| parse_error("no price found"))?;

        Ok(RawRecord {
            store_id: self.profile.store_id,
            name,
            price,
            url: page_url.to_string(),
            page_url: page_url.to_string(),
            category_hint: fields.category,
            referrer,
        })
    }
}

/// What one page visit yielded
struct Visited {
    page_url: Url,
    links: Vec<String>,
    product: Option<ExtractedFields>,
}

#[async_trait]
impl SourceAdapter for HtmlSourceAdapter {
    fn store_id(&self) -> StoreId {
        self.profile.store_id
    }

    fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.profile.category_path_prefix.clone())
    }

    async fn run_cycle(&self, sink: mpsc::Sender<AdapterItem>) -> Result<(), AdapterError> {
        let robots = self.load_robots().await;
        let delay = robots
            .crawl_delay()
            .map_or(self.limits.politeness_delay, |d| {
                d.max(self.limits.politeness_delay)
            });

        let mut seen: HashSet<String> = HashSet::new();
        let mut frontier: Vec<FrontierEntry> = Vec::new();
        for seed in &self.profile.seeds {
            match normalize_url(seed) {
                Ok(url) if seen.insert(url.to_string()) => frontier.push(FrontierEntry {
                    url,
                    referrer: None,
                }),
                Ok(_) => {}
                Err(e) => warn!("skipping seed '{}': {}", seed, e),
            }
        }

        let mut visited: u32 = 0;
        let mut records: u64 = 0;

        for depth in 0..=self.limits.max_depth {
            if frontier.is_empty() || visited >= self.limits.max_pages {
                break;
            }

            let remaining = (self.limits.max_pages - visited) as usize;
            let batch: Vec<FrontierEntry> = std::mem::take(&mut frontier)
                .into_iter()
                .filter(|entry| {
                    let allowed = robots.is_allowed(entry.url.as_str());
                    if !allowed {
                        debug!("robots.txt disallows {}", entry.url);
                    }
                    allowed
                })
                .take(remaining)
                .collect();
            visited += batch.len() as u32;

            debug!(
                "{}: depth {} with {} pages",
                self.profile.store_id,
                depth,
                batch.len()
            );

            let mut results = stream::iter(batch)
                .map(|entry| async move {
                    let result = self.visit(&entry, delay).await;
                    (entry, result)
                })
                .buffer_unordered(self.limits.max_concurrent_pages);

            let mut next_frontier = Vec::new();
            while let Some((entry, result)) = results.next().await {
                let item = match result {
                    Ok(page) => {
                        if depth < self.limits.max_depth {
                            for link in &page.links {
                                let Ok(url) = normalize_url(link) else {
                                    continue;
                                };
                                if self.should_follow(&url) && seen.insert(url.to_string()) {
                                    next_frontier.push(FrontierEntry {
                                        url,
                                        referrer: Some(page.page_url.to_string()),
                                    });
                                }
                            }
                        }

                        match page.product {
                            Some(fields) => {
                                match self.to_record(&page.page_url, entry.referrer, fields) {
                                    Ok(record) => {
                                        records += 1;
                                        AdapterItem::Record(record)
                                    }
                                    Err(error) => AdapterItem::PageFailed {
                                        url: page.page_url.to_string(),
                                        error,
                                    },
                                }
                            }
                            None => continue,
                        }
                    }
                    Err(error) => AdapterItem::PageFailed {
                        url: entry.url.to_string(),
                        error,
                    },
                };

                if sink.send(item).await.is_err() {
                    debug!("{}: receiver closed, stopping crawl", self.profile.store_id);
                    return Ok(());
                }
            }

            frontier = next_frontier;
        }

        info!(
            "{}: crawl visited {} pages, extracted {} records",
            self.profile.store_id, visited, records
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builtin_profile;

    fn adapter(profile: StoreProfile) -> HtmlSourceAdapter {
        let crawler = CrawlerConfig::default();
        let user_agent = UserAgentConfig {
            crawler_name: "GrocryBot".to_string(),
            crawler_version: "0.1".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        };
        HtmlSourceAdapter::new(profile, &crawler, &user_agent).unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_product_page_detection() {
        let tj = adapter(builtin_profile(StoreId::TraderJoes));
        assert!(tj.is_product_page(&url(
            "https://www.traderjoes.com/home/products/pdp/organic-milk-123"
        )));
        assert!(!tj.is_product_page(&url(
            "https://www.traderjoes.com/home/products/category/food-8"
        )));
    }

    #[test]
    fn test_should_follow_stays_on_site() {
        let safeway = adapter(builtin_profile(StoreId::Safeway));
        assert!(safeway.should_follow(&url("https://www.safeway.com/shop/aisles/dairy.html")));
        assert!(safeway.should_follow(&url("https://www.safeway.com/shop/product/milk-1")));
        assert!(!safeway.should_follow(&url("https://www.safeway.com/account/login")));
        assert!(!safeway.should_follow(&url("https://www.starmarket.com/shop/aisles/dairy.html")));
    }

    #[test]
    fn test_to_record_requires_name_and_price() {
        let tj = adapter(builtin_profile(StoreId::TraderJoes));
        let page = url("https://www.traderjoes.com/home/products/pdp/milk-1");

        let record = tj
            .to_record(
                &page,
                Some("https://www.traderjoes.com/home/products/category/food-8".to_string()),
                ExtractedFields {
                    name: Some("Milk".to_string()),
                    price: Some("$3.49".to_string()),
                    category: None,
                },
            )
            .unwrap();
        assert_eq!(record.store_id, StoreId::TraderJoes);
        assert_eq!(record.url, page.to_string());
        assert!(record.referrer.is_some());

        let err = tj
            .to_record(
                &page,
                None,
                ExtractedFields {
                    name: Some("Milk".to_string()),
                    price: None,
                    category: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, AdapterError::Parse { .. }));
    }

    #[test]
    fn test_normalizer_uses_profile_prefix() {
        let tj = adapter(builtin_profile(StoreId::TraderJoes));
        let record = RawRecord {
            store_id: StoreId::TraderJoes,
            name: "Milk".to_string(),
            price: "3.49".to_string(),
            url: "https://www.traderjoes.com/home/products/pdp/milk-1".to_string(),
            page_url: "https://www.traderjoes.com/home/products/pdp/milk-1".to_string(),
            category_hint: None,
            referrer: Some("https://www.traderjoes.com/home/products/category/food-8".to_string()),
        };
        let product = tj.normalizer().normalize(record, chrono::Utc::now()).unwrap();
        assert_eq!(product.category.as_deref(), Some("Food"));
    }
}
