//! End-to-end ingestion against a mock store website

use crate::common::*;
use grocry::config::MatcherConfig;
use grocry::crawler::run_ingest_cycle;
use grocry::storage::{CatalogStore, CycleStatus, SqliteCatalog};
use grocry::{Price, PriceMatcher, StoreId};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn names(matcher: &PriceMatcher, target_cents: i64, max: u32) -> Vec<String> {
    matcher
        .match_price(Price::from_minor_units(target_cents), max)
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect()
}

fn matcher(catalog: Arc<SqliteCatalog>) -> PriceMatcher {
    PriceMatcher::new(
        catalog,
        MatcherConfig::default(),
        Duration::from_secs(48 * 60 * 60),
    )
}

#[tokio::test]
async fn test_full_cycle_single_store() {
    let server = MockServer::start().await;
    mount_grocery_site(&server).await;

    let (_dir, catalog) = temp_catalog();
    let outcome = run_ingest_cycle(
        &adapter(&server),
        &catalog,
        &settings(Duration::from_secs(30)),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.status, CycleStatus::Succeeded);
    assert_eq!(outcome.stats.upserted, 3);
    assert_eq!(outcome.stats.failed_pages, 0);
    assert_eq!(catalog.count_products().unwrap(), 3);

    let milk = catalog
        .get_product(StoreId::TraderJoes, &product_url(&server, "milk"))
        .unwrap()
        .unwrap();
    assert_eq!(milk.name, "Milk");
    assert_eq!(milk.price, Price::from_minor_units(349));
    assert_eq!(milk.category.as_deref(), Some("Food"));

    let catalog = Arc::new(catalog);
    assert_eq!(names(&matcher(catalog), 350, 2), vec!["Milk", "Bread"]);
}

#[tokio::test]
async fn test_robots_disallowed_pages_not_fetched() {
    let server = MockServer::start().await;
    mount_robots(
        &server,
        "User-agent: *\nDisallow: /home/products/pdp/secret\n",
    )
    .await;
    mount_listing(&server, &["milk", "secret"]).await;
    mount_product(&server, "milk", "Milk", "$3.49").await;
    Mock::given(method("GET"))
        .and(path("/home/products/pdp/secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (_dir, catalog) = temp_catalog();
    let outcome = run_ingest_cycle(
        &adapter(&server),
        &catalog,
        &settings(Duration::from_secs(30)),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.status, CycleStatus::Succeeded);
    assert_eq!(outcome.stats.upserted, 1);
    assert_eq!(outcome.stats.failed_pages, 0);
}

#[tokio::test]
async fn test_second_cycle_updates_and_prunes() {
    let server = MockServer::start().await;
    mount_grocery_site(&server).await;

    let (_dir, catalog) = temp_catalog();
    let cancel = CancellationToken::new();
    run_ingest_cycle(&adapter(&server), &catalog, &settings(Duration::from_secs(30)), &cancel)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;

    // Cycle 2: Milk drops to 2.99, Bread disappears from the listing
    server.reset().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_listing(&server, &["milk", "eggs"]).await;
    mount_product(&server, "milk", "Milk", "$2.99").await;
    mount_product(&server, "eggs", "Eggs", "$4.00").await;

    let outcome =
        run_ingest_cycle(&adapter(&server), &catalog, &settings(Duration::from_secs(30)), &cancel)
            .await
            .unwrap();
    assert_eq!(outcome.status, CycleStatus::Succeeded);
    assert_eq!(outcome.pruned, 1);

    let catalog = Arc::new(catalog);
    assert_eq!(names(&matcher(catalog.clone()), 300, 10), vec!["Milk", "Eggs"]);

    let milk = catalog
        .get_product(StoreId::TraderJoes, &product_url(&server, "milk"))
        .unwrap()
        .unwrap();
    assert_eq!(milk.price, Price::from_minor_units(299));
}

#[tokio::test]
async fn test_broken_layout_preserves_prior_data() {
    let server = MockServer::start().await;
    mount_grocery_site(&server).await;

    let (_dir, catalog) = temp_catalog();
    let cancel = CancellationToken::new();
    run_ingest_cycle(&adapter(&server), &catalog, &settings(Duration::from_secs(30)), &cancel)
        .await
        .unwrap();

    // The site changes its markup: product pages no longer carry a price node
    server.reset().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_listing(&server, &["milk", "bread", "eggs"]).await;
    for slug in ["milk", "bread", "eggs"] {
        Mock::given(method("GET"))
            .and(path(format!("/home/products/pdp/{}", slug)))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "<html><body><h1>Redesigned</h1></body></html>",
                "text/html",
            ))
            .mount(&server)
            .await;
    }

    let outcome =
        run_ingest_cycle(&adapter(&server), &catalog, &settings(Duration::from_secs(30)), &cancel)
            .await
            .unwrap();

    assert_eq!(outcome.status, CycleStatus::Failed);
    assert_eq!(outcome.stats.upserted, 0);
    assert_eq!(outcome.stats.failed_pages, 3);
    assert_eq!(outcome.pruned, 0);

    let catalog = Arc::new(catalog);
    assert_eq!(names(&matcher(catalog), 350, 2), vec!["Milk", "Bread"]);
}

#[tokio::test]
async fn test_page_failure_does_not_abort_cycle() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_listing(&server, &["milk", "gone"]).await;
    mount_product(&server, "milk", "Milk", "$3.49").await;
    mount_status(&server, "gone", 500).await;

    let (_dir, catalog) = temp_catalog();
    let outcome = run_ingest_cycle(
        &adapter(&server),
        &catalog,
        &settings(Duration::from_secs(30)),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.status, CycleStatus::Succeeded);
    assert_eq!(outcome.stats.upserted, 1);
    assert_eq!(outcome.stats.failed_pages, 1);
}

#[tokio::test]
async fn test_cycle_timeout_keeps_committed_records() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_listing(&server, &["milk", "slow"]).await;
    mount_product(&server, "milk", "Milk", "$3.49").await;
    mount_slow_product(&server, "slow", Duration::from_secs(10)).await;

    let (_dir, catalog) = temp_catalog();
    let outcome = run_ingest_cycle(
        &adapter(&server),
        &catalog,
        &settings(Duration::from_secs(1)),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.status, CycleStatus::Failed);
    assert!(outcome.error.unwrap().contains("timed out"));
    assert_eq!(outcome.pruned, 0);
    assert!(catalog
        .get_product(StoreId::TraderJoes, &product_url(&server, "milk"))
        .unwrap()
        .is_some());

    let cycle = catalog.latest_cycle(StoreId::TraderJoes).unwrap().unwrap();
    assert_eq!(cycle.status, CycleStatus::Failed);
}
