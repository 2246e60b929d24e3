/// Checks if a domain matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches the bare domain and any
///    subdomain depth below it
///
/// # Examples
///
/// ```
/// use grocry::url::matches_wildcard;
///
/// assert!(matches_wildcard("safeway.com", "safeway.com"));
/// assert!(matches_wildcard("*.safeway.com", "www.safeway.com"));
/// assert!(!matches_wildcard("*.safeway.com", "safeway.com.evil.net"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Matches a URL against a `*` glob pattern
///
/// `*` matches any run of characters (including none); every other
/// character matches itself. Patterns are anchored at both ends, so a
/// pattern meant to match anywhere in the URL is written `*shop/product/*`.
///
/// # Examples
///
/// ```
/// use grocry::url::matches_glob;
///
/// assert!(matches_glob("*products/pdp/*", "https://www.traderjoes.com/home/products/pdp/milk-1"));
/// assert!(!matches_glob("*products/pdp/*", "https://www.traderjoes.com/home/recipes"));
/// ```
pub fn matches_glob(pattern: &str, candidate: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    // No wildcard at all: exact comparison
    if parts.len() == 1 {
        return pattern == candidate;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];

    if !candidate.starts_with(first) {
        return false;
    }
    let mut rest = &candidate[first.len()..];

    for middle in &parts[1..parts.len() - 1] {
        if middle.is_empty() {
            continue;
        }
        match rest.find(middle) {
            Some(at) => rest = &rest[at + middle.len()..],
            None => return false,
        }
    }

    rest.len() >= last.len() && rest.ends_with(last)
}
