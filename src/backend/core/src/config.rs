//! Configuration management.

use serde::Deserialize;

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Document store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Query cache configuration
    #[serde(default)]
    pub cache: CacheSettings,

    /// Access control configuration
    #[serde(default)]
    pub security: SecuritySettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Which document store backend to wire at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// In-process store, used for development and tests.
    Memory,
    /// No store wired; the sync service degrades to empty reads.
    Unconfigured,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store backend selection
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,

    /// Change-signal channel capacity per collection
    #[serde(default = "default_change_buffer")]
    pub change_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            change_buffer: default_change_buffer(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Default TTL for cached query results, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub default_ttl_secs: u64,

    /// TTL for dynamic-content lookups, in seconds
    #[serde(default = "default_dynamic_content_ttl_secs")]
    pub dynamic_content_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_cache_ttl_secs(),
            dynamic_content_ttl_secs: default_dynamic_content_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecuritySettings {
    /// Default sliding-window rate limit per (user, action)
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,

    /// Sliding window size in milliseconds
    #[serde(default = "default_rate_window_ms")]
    pub rate_window_ms: u64,

    /// Access log ring capacity
    #[serde(default = "default_access_log_capacity")]
    pub access_log_capacity: usize,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            rate_limit: default_rate_limit(),
            rate_window_ms: default_rate_window_ms(),
            access_log_capacity: default_access_log_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

// Default value functions
fn default_store_backend() -> StoreBackend {
    StoreBackend::Memory
}
fn default_change_buffer() -> usize {
    64
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_dynamic_content_ttl_secs() -> u64 {
    300
}
fn default_rate_limit() -> usize {
    100
}
fn default_rate_window_ms() -> u64 {
    60_000
}
fn default_access_log_capacity() -> usize {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_json_logging() -> bool {
    true
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("DUETRACK").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("DUETRACK").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.cache.default_ttl_secs, 300);
        assert_eq!(cfg.security.rate_limit, 100);
        assert_eq!(cfg.security.rate_window_ms, 60_000);
        assert_eq!(cfg.security.access_log_capacity, 1000);
    }

    #[test]
    fn test_load_from_empty_env() {
        // No DUETRACK__* variables set in the test environment; defaults apply.
        let cfg = Config::load().unwrap();
        assert_eq!(cfg.cache.dynamic_content_ttl_secs, 300);
        assert!(cfg.observability.json_logging);
    }
}
