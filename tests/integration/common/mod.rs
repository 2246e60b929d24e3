//! Shared fixtures: a mock store website and matching configuration

use grocry::config::{CrawlerConfig, StoreProfile, UserAgentConfig};
use grocry::crawler::{CycleSettings, HtmlSourceAdapter};
use grocry::storage::SqliteCatalog;
use grocry::StoreId;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LISTING: &str = "/home/products/category/food-8";

pub fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "GrocryTestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

pub fn crawler_config() -> CrawlerConfig {
    CrawlerConfig {
        max_concurrent_pages: 2,
        page_timeout_secs: 30,
        minimum_time_on_page: 0,
        max_pages: 50,
        max_depth: 2,
        ..CrawlerConfig::default()
    }
}

pub fn settings(cycle_timeout: Duration) -> CycleSettings {
    CycleSettings {
        cycle_timeout,
        config_hash: "integration".to_string(),
    }
}

/// Profile of a Trader Joe's-shaped site served by `server`
pub fn profile(server: &MockServer) -> StoreProfile {
    StoreProfile {
        store_id: StoreId::TraderJoes,
        seeds: vec![format!("{}{}", server.uri(), LISTING)],
        domain: "127.0.0.1".to_string(),
        follow_patterns: vec!["*/home/products/category/*".to_string()],
        product_patterns: vec!["*/home/products/pdp/*".to_string()],
        name_selector: "h1".to_string(),
        price_selector: ".price".to_string(),
        category_selector: None,
        category_path_prefix: Some("/home/products/category/".to_string()),
        respect_robots: true,
    }
}

pub fn adapter(server: &MockServer) -> HtmlSourceAdapter {
    HtmlSourceAdapter::new(profile(server), &crawler_config(), &user_agent()).unwrap()
}

pub fn temp_catalog() -> (TempDir, SqliteCatalog) {
    let dir = TempDir::new().unwrap();
    let catalog = SqliteCatalog::open(&dir.path().join("catalog.db")).unwrap();
    (dir, catalog)
}

pub fn product_url(server: &MockServer, slug: &str) -> String {
    format!("{}/home/products/pdp/{}", server.uri(), slug)
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body),
        "text/html; charset=utf-8",
    )
}

pub async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Mounts a listing page linking to `/home/products/pdp/<slug>` for each slug
pub async fn mount_listing(server: &MockServer, slugs: &[&str]) {
    let links: String = slugs
        .iter()
        .map(|slug| format!(r#"<a href="/home/products/pdp/{0}">{0}</a>"#, slug))
        .collect();

    Mock::given(method("GET"))
        .and(path(LISTING))
        .respond_with(html(&format!(
            r#"<h1>Food</h1>{}<a href="https://elsewhere.example/x">ad</a>"#,
            links
        )))
        .mount(server)
        .await;
}

/// Mounts a product page
pub async fn mount_product(server: &MockServer, slug: &str, name: &str, price: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/home/products/pdp/{}", slug)))
        .respond_with(html(&format!(
            r#"<h1>{}</h1><span class="price">{}</span>"#,
            name, price
        )))
        .mount(server)
        .await;
}

/// Mounts a product page that answers only after `delay`
pub async fn mount_slow_product(server: &MockServer, slug: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(format!("/home/products/pdp/{}", slug)))
        .respond_with(
            html(r#"<h1>Slow</h1><span class="price">$1.00</span>"#).set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Mounts a product page with the given status and no body
pub async fn mount_status(server: &MockServer, slug: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/home/products/pdp/{}", slug)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// The standard site: Milk 3.49, Bread 3.00, Eggs 4.00
pub async fn mount_grocery_site(server: &MockServer) {
    mount_robots(server, "User-agent: *\nAllow: /\n").await;
    mount_listing(server, &["milk", "bread", "eggs"]).await;
    mount_product(server, "milk", "Milk", "$3.49").await;
    mount_product(server, "bread", "Bread", "$3.00").await;
    mount_product(server, "eggs", "Eggs", "$4.00").await;
}
