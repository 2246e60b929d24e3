//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests made during a crawl cycle:
//! - Building HTTP clients with proper user agent strings and timeouts
//! - GET requests for store pages
//! - Classifying failures into `AdapterError::Fetch`

use crate::config::UserAgentConfig;
use crate::AdapterError;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,

    /// Page body content
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `page_timeout` - Upper bound for one complete request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use grocry::config::UserAgentConfig;
/// use grocry::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "GrocryBot".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    page_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(page_timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(page_timeout))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches one page
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with HTML (or unlabelled) body | `Ok(FetchedPage)` |
/// | Any other status | `Fetch` error naming the status |
/// | Non-HTML Content-Type | `Fetch` error naming the type |
/// | Timeout, connect failure, body read failure | `Fetch` error |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
pub async fn fetch_page(client: &Client, url: &Url) -> Result<FetchedPage, AdapterError> {
    let fetch_error = |message: String| AdapterError::Fetch {
        url: url.to_string(),
        message,
    };

    let response = client.get(url.as_str()).send().await.map_err(|e| {
        if e.is_timeout() {
            fetch_error("request timed out".to_string())
        } else if e.is_connect() {
            fetch_error(format!("connection failed: {}", e))
        } else if e.is_redirect() {
            fetch_error(format!("redirect error: {}", e))
        } else {
            fetch_error(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(fetch_error(format!("HTTP {}", status.as_u16())));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if !content_type.is_empty() && !content_type.contains("html") {
        return Err(fetch_error(format!(
            "unexpected content type '{}'",
            content_type
        )));
    }

    let final_url = response.url().clone();
    let body = response
        .text()
        .await
        .map_err(|e| fetch_error(format!("body read failed: {}", e)))?;

    Ok(FetchedPage { final_url, body })
}
