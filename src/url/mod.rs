//! URL handling module
//!
//! This module provides URL normalization (the identity half of a product's
//! `(store, url)` key), host extraction, and the wildcard matching used to
//! keep a crawl inside a store's site and on its product pages.

mod matcher;
mod normalize;

pub use matcher::{matches_glob, matches_wildcard};
pub use normalize::normalize_url;

use url::Url;

/// Extracts the lowercase host from a URL
///
/// Returns None for URLs without a host.
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether a URL belongs to the site described by `domain_pattern`
///
/// The pattern uses the `*.example.com` wildcard form; a `www.` prefix on
/// the URL host is ignored so `traderjoes.com` covers `www.traderjoes.com`.
pub fn is_within_domain(url: &Url, domain_pattern: &str) -> bool {
    match extract_domain(url) {
        Some(host) => {
            let bare = host.strip_prefix("www.").unwrap_or(&host);
            matches_wildcard(domain_pattern, &host) || matches_wildcard(domain_pattern, bare)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain_lowercases() {
        let url = Url::parse("https://WWW.Safeway.COM/shop").unwrap();
        assert_eq!(extract_domain(&url), Some("www.safeway.com".to_string()));
    }

    #[test]
    fn test_extract_domain_ignores_port() {
        let url = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_within_domain_exact_and_www() {
        let url = Url::parse("https://www.traderjoes.com/home/products").unwrap();
        assert!(is_within_domain(&url, "traderjoes.com"));
        assert!(is_within_domain(&url, "*.traderjoes.com"));
    }

    #[test]
    fn test_within_domain_rejects_other_sites() {
        let url = Url::parse("https://ads.example.net/pixel").unwrap();
        assert!(!is_within_domain(&url, "*.traderjoes.com"));
    }
}
