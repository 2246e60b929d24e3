//! Robots.txt handling module
//!
//! Each ingestion cycle fetches a store's robots.txt once and consults it
//! before every page request. A robots.txt that cannot be fetched imposes
//! no restrictions.

mod parser;

pub use parser::RobotsPolicy;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

/// Fetches robots.txt for the site serving `page_url`
///
/// # Arguments
///
/// * `client` - HTTP client carrying the crawler's user agent and timeout
/// * `page_url` - Any URL on the site; only its origin is used
/// * `agent` - The product token matched against `User-agent` groups
///
/// # Returns
///
/// The site's policy, or an allow-all policy when the file is missing or
/// the request fails
pub async fn fetch_robots(client: &Client, page_url: &Url, agent: &str) -> RobotsPolicy {
    let robots_url = match page_url.join("/robots.txt") {
        Ok(url) => url,
        Err(_) => return RobotsPolicy::allow_all(agent),
    };

    let response = match client.get(robots_url.as_str()).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("robots.txt fetch failed for {}: {}", robots_url, e);
            return RobotsPolicy::allow_all(agent);
        }
    };

    let status = response.status();
    if status == StatusCode::NOT_FOUND || !status.is_success() {
        debug!("no usable robots.txt at {} ({})", robots_url, status);
        return RobotsPolicy::allow_all(agent);
    }

    match response.text().await {
        Ok(body) => RobotsPolicy::from_content(&body, agent),
        Err(e) => {
            warn!("robots.txt body unreadable at {}: {}", robots_url, e);
            RobotsPolicy::allow_all(agent)
        }
    }
}
