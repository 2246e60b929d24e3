//! Configuration module for Grocry
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and resolves each `[[store]]` entry against the store's built-in
//! crawl profile.
//!
//! # Example
//!
//! ```no_run
//! use grocry::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("grocry.toml")).unwrap();
//! println!("Serving on {}", config.server.bind_address);
//! ```

mod parser;
mod profiles;
mod types;
mod validation;

pub use types::{
    CatalogConfig, Config, CrawlerConfig, MatcherConfig, ScheduleConfig, ServerConfig,
    StoreEntry, StoreProfile, UserAgentConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use profiles::{builtin_profile, resolve_profile};
pub use validation::validate;

impl Config {
    /// Resolved profiles of every enabled store, in configuration order
    pub fn enabled_profiles(&self) -> Vec<StoreProfile> {
        self.stores
            .iter()
            .filter(|entry| entry.enabled)
            .map(resolve_profile)
            .collect()
    }
}
