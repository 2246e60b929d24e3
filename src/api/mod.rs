//! HTTP API
//!
//! Routes:
//! - `GET /` - health, degraded when stores keep failing
//! - `GET /products-matching-price` - price proximity search
//! - `POST /stores/:store_id/refresh` - manual ingestion trigger

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{Message, ProductItem};

use crate::config::ServerConfig;
use crate::crawler::SchedulerHandle;
use crate::matcher::PriceMatcher;
use crate::storage::CatalogStore;
use crate::ConfigError;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    pub matcher: PriceMatcher,
    pub scheduler: SchedulerHandle,
}

/// Builds the application router
///
/// # Errors
///
/// Fails if a configured CORS origin is not a valid header value
pub fn router(state: AppState, config: &ServerConfig) -> Result<Router, ConfigError> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_origin(allowed_origins(&config.allowed_origins)?);

    Ok(Router::new()
        .route("/", get(handlers::health))
        .route("/products-matching-price", get(handlers::products_matching_price))
        .route("/stores/:store_id/refresh", post(handlers::refresh_store))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn allowed_origins(origins: &[String]) -> Result<AllowOrigin, ConfigError> {
    if origins.iter().any(|o| o == "*") {
        return Ok(AllowOrigin::any());
    }

    let values = origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|_| {
                ConfigError::Validation(format!("Invalid CORS origin: {}", origin))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AllowOrigin::list(values))
}
