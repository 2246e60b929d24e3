use crate::UrlError;
use url::Url;

/// Query parameters that carry tracking state rather than product identity
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "mc_eid", "ref", "source", "cid", "icid", "msclkid",
];

/// Normalizes a product URL so every crawl of the same page yields one key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not HTTP(S)
/// 2. Lowercase the host
/// 3. Resolve dot segments, collapse repeated slashes, drop the trailing
///    slash (except for root)
/// 4. Remove the fragment
/// 5. Remove tracking query parameters (`utm_*` and a fixed list)
/// 6. Sort the remaining query parameters; drop an empty query
///
/// The scheme and any `www.` prefix are kept so the result stays fetchable.
///
/// # Examples
///
/// ```
/// use grocry::url::normalize_url;
///
/// let url = normalize_url("https://WWW.Safeway.com/shop/product/milk/?utm_source=app#reviews").unwrap();
/// assert_eq!(url.as_str(), "https://www.safeway.com/shop/product/milk");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let path = normalize_path(url.path());
    url.set_path(&path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (k, v) in &params {
                serializer.append_pair(k, v);
            }
            url.set_query(Some(&serializer.finish()));
        }
    }

    Ok(url)
}

fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_scheme_and_www() {
        let result = normalize_url("http://www.traderjoes.com/home").unwrap();
        assert_eq!(result.as_str(), "http://www.traderjoes.com/home");
    }

    #[test]
    fn test_lowercase_host_only() {
        let result = normalize_url("https://SAFEWAY.COM/Shop/Product").unwrap();
        assert_eq!(result.as_str(), "https://safeway.com/Shop/Product");
    }

    #[test]
    fn test_trailing_slash_and_dots() {
        let result = normalize_url("https://safeway.com/a/../shop//product/./milk/").unwrap();
        assert_eq!(result.as_str(), "https://safeway.com/shop/product/milk");
    }

    #[test]
    fn test_root_path() {
        let result = normalize_url("https://safeway.com").unwrap();
        assert_eq!(result.as_str(), "https://safeway.com/");
    }

    #[test]
    fn test_removes_fragment() {
        let result = normalize_url("https://safeway.com/milk#nutrition").unwrap();
        assert_eq!(result.as_str(), "https://safeway.com/milk");
    }

    #[test]
    fn test_removes_tracking_and_sorts() {
        let result = normalize_url(
            "https://starmarket.com/shop/aisles/dairy.html?sort=&page=1&utm_campaign=x&loc=3588&gclid=1",
        )
        .unwrap();
        assert_eq!(
            result.as_str(),
            "https://starmarket.com/shop/aisles/dairy.html?loc=3588&page=1&sort="
        );
    }

    #[test]
    fn test_query_emptied_by_tracking_removal() {
        let result = normalize_url("https://safeway.com/milk?utm_source=app&fbclid=9").unwrap();
        assert_eq!(result.as_str(), "https://safeway.com/milk");
    }

    #[test]
    fn test_rejects_non_http() {
        let result = normalize_url("ftp://safeway.com/milk");
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(normalize_url("milk"), Err(UrlError::Parse(_))));
    }
}
