//! Scheduler and HTTP API running together over a mock store website

use crate::common::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use grocry::api::{router, AppState};
use grocry::config::{MatcherConfig, ScheduleConfig, ServerConfig};
use grocry::crawler::{Scheduler, SchedulerHandle, SourceAdapter};
use grocry::storage::CatalogStore;
use grocry::{IngestState, PriceMatcher, StoreId};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::MockServer;

async fn start_service(server: &MockServer) -> (tempfile::TempDir, SchedulerHandle, Router) {
    let (dir, catalog) = temp_catalog();
    let catalog: Arc<dyn CatalogStore> = Arc::new(catalog);
    let adapter: Arc<dyn SourceAdapter> = Arc::new(adapter(server));

    let scheduler = Scheduler::new(
        vec![adapter],
        catalog.clone(),
        ScheduleConfig::default(),
        settings(Duration::from_secs(30)),
    )
    .with_compaction(Duration::from_secs(3600), Duration::from_secs(48 * 60 * 60))
    .start();

    let state = AppState {
        catalog: catalog.clone(),
        matcher: PriceMatcher::new(
            catalog,
            MatcherConfig::default(),
            Duration::from_secs(48 * 60 * 60),
        ),
        scheduler: scheduler.clone(),
    };
    let app = router(state, &ServerConfig::default()).unwrap();
    (dir, scheduler, app)
}

async fn wait_for_cycle(scheduler: &SchedulerHandle) {
    for _ in 0..500 {
        let health = scheduler.health().await;
        if health[0].last_outcome.is_some() && health[0].state == IngestState::Idle {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("startup cycle did not finish");
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_startup_cycle_serves_matches() {
    let server = MockServer::start().await;
    mount_grocery_site(&server).await;

    let (_dir, scheduler, app) = start_service(&server).await;
    wait_for_cycle(&scheduler).await;

    let (status, body) = send(&app, "GET", "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "ok");

    let (status, body) = send(&app, "GET", "/products-matching-price?price=3.50&max_products=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Milk");
    assert_eq!(body[0]["price"], 3.49);
    assert_eq!(body[0]["url"], product_url(&server, "milk"));
    assert_eq!(body[1]["name"], "Bread");

    scheduler.shutdown().await;
}

#[tokio::test]
async fn test_failing_store_degrades_health() {
    let server = MockServer::start().await;
    // Nothing mounted: every page answers 404, so the cycle yields no records

    let (_dir, scheduler, app) = start_service(&server).await;
    wait_for_cycle(&scheduler).await;

    let health = scheduler.health().await;
    assert_eq!(health[0].store, StoreId::TraderJoes);
    assert_eq!(health[0].last_outcome, Some(IngestState::Failed));
    assert_eq!(health[0].consecutive_failures, 1);

    // Below the default threshold of three failures the service still reports ok
    let (status, body) = send(&app, "GET", "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "ok");

    let (status, body) = send(&app, "GET", "/products-matching-price?price=3.50").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));

    scheduler.shutdown().await;
}

#[tokio::test]
async fn test_manual_refresh_endpoint() {
    let server = MockServer::start().await;
    mount_grocery_site(&server).await;

    let (_dir, scheduler, app) = start_service(&server).await;
    wait_for_cycle(&scheduler).await;

    let (status, body) = send(&app, "POST", "/stores/trader-joes/refresh").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body["message"].as_str().unwrap().contains("trader-joes"));

    let (status, _) = send(&app, "POST", "/stores/safeway/refresh").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    scheduler.shutdown().await;
}
