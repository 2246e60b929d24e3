use crate::config::profiles::resolve_profile;
use crate::config::types::{
    CatalogConfig, Config, CrawlerConfig, MatcherConfig, ScheduleConfig, ServerConfig,
    StoreEntry, StoreProfile, UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_server_config(&config.server)?;
    validate_crawler_config(&config.crawler)?;
    validate_schedule_config(&config.schedule)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_catalog_config(&config.catalog)?;
    validate_matcher_config(&config.matcher)?;
    validate_stores(&config.stores)?;
    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.bind_address.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!(
            "bind_address '{}' is not a socket address: {}",
            config.bind_address, e
        ))
    })?;

    for origin in &config.allowed_origins {
        if origin == "*" {
            continue;
        }
        Url::parse(origin).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid allowed origin '{}': {}", origin, e))
        })?;
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_pages < 1 || config.max_concurrent_pages > 32 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_pages must be between 1 and 32, got {}",
            config.max_concurrent_pages
        )));
    }

    if config.page_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "page_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.cycle_timeout_secs < config.page_timeout_secs {
        return Err(ConfigError::Validation(format!(
            "cycle_timeout_secs ({}) must be >= page_timeout_secs ({})",
            config.cycle_timeout_secs, config.page_timeout_secs
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    if config.interval_secs < 60 {
        return Err(ConfigError::Validation(format!(
            "interval_secs must be >= 60, got {}",
            config.interval_secs
        )));
    }

    if config.retry_base_secs < 1 {
        return Err(ConfigError::Validation(
            "retry_base_secs must be >= 1".to_string(),
        ));
    }

    if config.retry_max_secs < config.retry_base_secs {
        return Err(ConfigError::Validation(format!(
            "retry_max_secs ({}) must be >= retry_base_secs ({})",
            config.retry_max_secs, config.retry_base_secs
        )));
    }

    if config.degraded_after_failures < 1 {
        return Err(ConfigError::Validation(
            "degraded_after_failures must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.staleness_window_secs == 0 {
        return Err(ConfigError::Validation(
            "staleness_window_secs must be > 0".to_string(),
        ));
    }

    if config.compaction_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "compaction_interval_secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_matcher_config(config: &MatcherConfig) -> Result<(), ConfigError> {
    if config.max_results_upper_bound < 1 {
        return Err(ConfigError::Validation(
            "max_results_upper_bound must be >= 1".to_string(),
        ));
    }

    if config.default_max_results < 1 || config.default_max_results > config.max_results_upper_bound
    {
        return Err(ConfigError::Validation(format!(
            "default_max_results must be between 1 and {}, got {}",
            config.max_results_upper_bound, config.default_max_results
        )));
    }

    Ok(())
}

/// Validates store entries, resolved against their built-in profiles
fn validate_stores(stores: &[StoreEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in stores {
        if !seen.insert(entry.id) {
            return Err(ConfigError::Validation(format!(
                "store '{}' is configured more than once",
                entry.id
            )));
        }

        validate_profile(&resolve_profile(entry))?;
    }

    Ok(())
}

fn validate_profile(profile: &StoreProfile) -> Result<(), ConfigError> {
    validate_domain_pattern(&profile.domain)?;

    if profile.seeds.is_empty() {
        return Err(ConfigError::Validation(format!(
            "store '{}' must have at least one seed URL",
            profile.store_id
        )));
    }

    for seed in &profile.seeds {
        let url = Url::parse(seed).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e))
        })?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use http or https",
                seed
            )));
        }
    }

    if profile.product_patterns.is_empty() {
        return Err(ConfigError::Validation(format!(
            "store '{}' must have at least one product pattern",
            profile.store_id
        )));
    }

    for pattern in profile.follow_patterns.iter().chain(&profile.product_patterns) {
        if pattern.trim().is_empty() {
            return Err(ConfigError::InvalidPattern(format!(
                "store '{}' has an empty URL pattern",
                profile.store_id
            )));
        }
    }

    validate_selector(&profile.name_selector)?;
    validate_selector(&profile.price_selector)?;
    if let Some(selector) = &profile.category_selector {
        validate_selector(selector)?;
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern(format!("Invalid selector '{}': {}", selector, e)))
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);
    validate_domain_string(domain)
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'safeway.com')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| ConfigError::Validation(format!("Invalid email format: '{}'", email)))?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::StoreId;

    #[test]
    fn test_validate_domain_pattern() {
        assert!(validate_domain_pattern("safeway.com").is_ok());
        assert!(validate_domain_pattern("*.safeway.com").is_ok());
        assert!(validate_domain_pattern("127.0.0.1").is_ok());

        assert!(validate_domain_pattern("").is_err());
        assert!(validate_domain_pattern("*.").is_err());
        assert!(validate_domain_pattern("safeway").is_err());
        assert!(validate_domain_pattern(".safeway.com").is_err());
        assert!(validate_domain_pattern("safeway.com.").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
        assert!(validate_email("a@b@c.com").is_err());
    }

    #[test]
    fn test_validate_duplicate_store() {
        let stores = vec![
            StoreEntry::builtin(StoreId::Safeway),
            StoreEntry::builtin(StoreId::Safeway),
        ];
        assert!(matches!(
            validate_stores(&stores),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_builtin_profiles() {
        let stores: Vec<StoreEntry> = StoreId::all().into_iter().map(StoreEntry::builtin).collect();
        assert!(validate_stores(&stores).is_ok());
    }

    #[test]
    fn test_validate_bad_selector() {
        let mut entry = StoreEntry::builtin(StoreId::TraderJoes);
        entry.price_selector = Some("span[[".to_string());
        assert!(matches!(
            validate_stores(&[entry]),
            Err(ConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_validate_seed_scheme() {
        let mut entry = StoreEntry::builtin(StoreId::TraderJoes);
        entry.seeds = vec!["ftp://traderjoes.com/".to_string()];
        assert!(validate_stores(&[entry]).is_err());
    }

    #[test]
    fn test_validate_matcher_bounds() {
        let config = MatcherConfig {
            max_results_upper_bound: 5,
            default_max_results: 10,
            at_or_below_target: false,
        };
        assert!(validate_matcher_config(&config).is_err());
        assert!(validate_matcher_config(&MatcherConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_retry_bounds() {
        let config = ScheduleConfig {
            retry_base_secs: 120,
            retry_max_secs: 60,
            ..ScheduleConfig::default()
        };
        assert!(validate_schedule_config(&config).is_err());
    }
}
