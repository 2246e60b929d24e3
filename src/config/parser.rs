use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use grocry::config::load_config;
///
/// let config = load_config(Path::new("grocry.toml")).unwrap();
/// println!("Stores configured: {}", config.stores.len());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes the SHA-256 hash of a configuration file
///
/// Each ingestion cycle records this hash so a catalog row can be traced
/// back to the configuration that produced it.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded digest of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

/// Loads a configuration together with the hash of the exact text parsed
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_content(&content)))
}

fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::StoreId;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const USER_AGENT: &str = r#"
[user-agent]
crawler-name = "GrocryBot"
crawler-version = "0.1"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"
"#;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = format!(
            r#"
[server]
bind-address = "127.0.0.1:8080"

[crawler]
max-depth = 2
max-concurrent-pages = 4
{}
[catalog]
database-path = "./test.db"

[[store]]
id = "trader-joes"

[[store]]
id = "safeway"
enabled = false
seeds = ["https://www.safeway.com/shop/aisles/dairy.html"]
"#,
            USER_AGENT
        );

        let file = create_temp_config(&config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.crawler.max_depth, 2);
        assert_eq!(config.crawler.max_concurrent_pages, 4);
        assert_eq!(config.crawler.page_timeout_secs, 30);
        assert_eq!(config.user_agent.crawler_name, "GrocryBot");
        assert_eq!(config.matcher.max_results_upper_bound, 100);
        assert_eq!(config.stores.len(), 2);
        assert_eq!(config.stores[1].id, StoreId::Safeway);

        let enabled = config.enabled_profiles();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].store_id, StoreId::TraderJoes);
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse_config(USER_AGENT).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8000");
        assert_eq!(config.server.allowed_origins, vec!["*".to_string()]);
        assert_eq!(config.matcher.default_max_results, 10);
        assert!(!config.matcher.at_or_below_target);
        assert!(config.schedule.run_on_startup);
        assert!(config.stores.is_empty());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_store_id_rejected() {
        let content = format!("{}\n[[store]]\nid = \"whole-foods\"\n", USER_AGENT);
        assert!(matches!(parse_config(&content), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = format!("[crawler]\nmax-concurrent-pages = 0\n{}", USER_AGENT);
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_config_hash_tracks_content() {
        let a = create_temp_config("[user-agent]\ncrawler-name = \"a\"");
        let b = create_temp_config("[user-agent]\ncrawler-name = \"b\"");

        let hash_a = compute_config_hash(a.path()).unwrap();
        assert_eq!(hash_a.len(), 64);
        assert_eq!(hash_a, compute_config_hash(a.path()).unwrap());
        assert_ne!(hash_a, compute_config_hash(b.path()).unwrap());
    }

    #[test]
    fn test_load_config_with_hash() {
        let file = create_temp_config(USER_AGENT);
        let (config, hash) = load_config_with_hash(file.path()).unwrap();
        assert_eq!(config.user_agent.crawler_version, "0.1");
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());
    }
}
