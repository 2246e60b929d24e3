use crate::api::{ApiError, AppState};
use crate::product::{Price, Product, StoreId};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Body of every non-list response
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// One entry of a price match response
#[derive(Debug, Serialize)]
pub struct ProductItem {
    pub name: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    pub url: String,
}

impl From<Product> for ProductItem {
    fn from(product: Product) -> Self {
        Self {
            name: product.name,
            price: product.price.to_decimal(),
            url: product.url,
        }
    }
}

/// Raw query parameters, validated in the handler
#[derive(Debug, Deserialize)]
pub struct MatchParams {
    pub price: Option<String>,
    pub max_products: Option<String>,
}

/// `GET /`
///
/// 503 when the catalog cannot be read; otherwise 200 with `"ok"` or a
/// message naming the degraded stores.
pub async fn health(State(state): State<AppState>) -> Result<Json<Message>, ApiError> {
    state.catalog.health_check()?;

    let degraded = state.scheduler.degraded_stores().await;
    if degraded.is_empty() {
        return Ok(Message::new("ok"));
    }

    let names: Vec<&str> = degraded.iter().map(|s| s.to_db_string()).collect();
    Ok(Message::new(format!("degraded: {}", names.join(", "))))
}

/// `GET /products-matching-price?price=<decimal>&max_products=<int>`
pub async fn products_matching_price(
    State(state): State<AppState>,
    params: Result<Query<MatchParams>, QueryRejection>,
) -> Result<Json<Vec<ProductItem>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::InvalidArgument(e.body_text()))?;

    let raw_price = params
        .price
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::InvalidArgument("price is required".to_string()))?;

    let price = parse_query_price(raw_price)?;

    let max_results = match params.max_products.as_deref().map(str::trim) {
        None | Some("") => state.matcher.default_max_results(),
        Some(raw) => raw.parse::<u32>().map_err(|_| {
            ApiError::InvalidArgument(format!(
                "max_products must be a positive integer, got '{}'",
                raw
            ))
        })?,
    };

    let products = state.matcher.match_price(price, max_results)?;
    Ok(Json(products.into_iter().map(ProductItem::from).collect()))
}

/// `POST /stores/:store_id/refresh`
pub async fn refresh_store(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let store = StoreId::from_db_string(&store_id)
        .ok_or_else(|| ApiError::NotFound(format!("unknown store '{}'", store_id)))?;

    if !state.scheduler.trigger(store) {
        return Err(ApiError::NotFound(format!(
            "store '{}' is not enabled",
            store_id
        )));
    }

    Ok((
        StatusCode::ACCEPTED,
        Message::new(format!("refresh started for {}", store)),
    ))
}

/// Parses a query price as a plain decimal number
///
/// Stricter than `Price::parse`: labels, currency symbols and thousands
/// separators are refused, and `.` is always the decimal point.
fn parse_query_price(raw: &str) -> Result<Price, ApiError> {
    let invalid = || {
        ApiError::InvalidArgument(format!("price must be a decimal number, got '{}'", raw))
    };

    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let well_formed = digits.bytes().any(|b| b.is_ascii_digit())
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && digits.bytes().filter(|&b| b == b'.').count() <= 1;
    if !well_formed {
        return Err(invalid());
    }

    let amount = Decimal::from_str(raw).map_err(|_| invalid())?;
    Price::from_decimal(amount)
        .map_err(|e| ApiError::InvalidArgument(format!("invalid price '{}': {}", raw, e)))
}
