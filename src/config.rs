//! Configuration for the TeamCity client core
//!
//! Covers the resilience knobs (retry, circuit breaker) and pagination
//! defaults, with env-var and TOML file loading.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, TeamCityError};

/// Top-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the TeamCity server, e.g. `https://teamcity.example.com`
    pub base_url: String,

    /// Authentication to attach to outgoing requests
    pub auth: AuthConfig,

    /// Request timeout applied by the concrete transport
    pub request_timeout_ms: u64,

    /// Retry configuration
    pub retry: RetryConfig,

    /// Circuit breaker configuration
    pub breaker: BreakerConfig,

    /// Pagination configuration
    pub paging: PagingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8111".to_string(),
            auth: AuthConfig::default(),
            request_timeout_ms: 30_000,
            retry: RetryConfig::default(),
            breaker: BreakerConfig::default(),
            paging: PagingConfig::default(),
        }
    }
}

/// Authentication mode for the concrete transport
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthConfig {
    /// No credentials attached (guest access)
    #[default]
    Guest,
    /// Bearer token authentication
    Token { token: String },
    /// Basic authentication
    Basic { username: String, password: String },
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Whether retrying is enabled at all
    pub enabled: bool,

    /// Maximum number of retries after the initial attempt
    pub max_retries: usize,

    /// Base delay between attempts, milliseconds
    pub base_delay_ms: u64,

    /// Upper bound for any computed delay, milliseconds
    pub max_delay_ms: u64,

    /// Exponential backoff; when false every delay equals the base delay
    pub exponential: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            exponential: true,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Whether the breaker gates calls at all
    pub enabled: bool,

    /// Consecutive failures that trip the breaker open
    pub failure_threshold: usize,

    /// How long the breaker stays open before allowing a probe, milliseconds
    pub reset_timeout_ms: u64,

    /// Consecutive probe successes that close the breaker again
    pub success_threshold: usize,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            reset_timeout_ms: 30_000,
            success_threshold: 2,
        }
    }
}

impl BreakerConfig {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }
}

/// Pagination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    /// Page size used when the caller does not specify one
    pub default_page_size: usize,

    /// Hard cap on any requested page size
    pub max_page_size: usize,

    /// Auto-fetch all pages when the caller does not state an intent
    pub auto_fetch_all: bool,

    /// Page-count bound for auto-fetching
    pub max_pages: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: 100,
            max_page_size: 1_000,
            auto_fetch_all: false,
            max_pages: 20,
        }
    }
}

/// Configuration builder
pub struct ConfigBuilder {
    config: ClientConfig,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.auth = AuthConfig::Token {
            token: token.into(),
        };
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.auth = AuthConfig::Basic {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn max_retries(mut self, retries: usize) -> Self {
        self.config.retry.max_retries = retries;
        self
    }

    pub fn retry_enabled(mut self, enabled: bool) -> Self {
        self.config.retry.enabled = enabled;
        self
    }

    pub fn breaker_enabled(mut self, enabled: bool) -> Self {
        self.config.breaker.enabled = enabled;
        self
    }

    pub fn failure_threshold(mut self, threshold: usize) -> Self {
        self.config.breaker.failure_threshold = threshold;
        self
    }

    pub fn default_page_size(mut self, size: usize) -> Self {
        self.config.paging.default_page_size = size;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Load configuration from environment variables
pub fn from_env() -> ClientConfig {
    let mut config = ClientConfig::default();

    if let Ok(url) = std::env::var("TEAMCITY_URL") {
        config.base_url = url;
    }

    if let Ok(token) = std::env::var("TEAMCITY_TOKEN") {
        config.auth = AuthConfig::Token { token };
    }

    if let Ok(retries) = std::env::var("TEAMCITY_MAX_RETRIES") {
        if let Ok(n) = retries.parse::<usize>() {
            config.retry.max_retries = n;
        }
    }

    if let Ok(enabled) = std::env::var("TEAMCITY_RETRY_ENABLED") {
        config.retry.enabled = enabled.to_lowercase() == "true" || enabled == "1";
    }

    if let Ok(size) = std::env::var("TEAMCITY_PAGE_SIZE") {
        if let Ok(n) = size.parse::<usize>() {
            config.paging.default_page_size = n;
        }
    }

    config
}

/// Load configuration from a TOML file
pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<ClientConfig> {
    let contents = std::fs::read_to_string(path)?;
    toml::from_str(&contents).map_err(|e| TeamCityError::Config {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.retry.enabled);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.paging.default_page_size, 100);
        assert!(matches!(config.auth, AuthConfig::Guest));
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .base_url("https://ci.example.com")
            .token("secret")
            .max_retries(5)
            .failure_threshold(2)
            .default_page_size(50)
            .build();

        assert_eq!(config.base_url, "https://ci.example.com");
        assert!(matches!(config.auth, AuthConfig::Token { .. }));
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.breaker.failure_threshold, 2);
        assert_eq!(config.paging.default_page_size, 50);
    }

    #[test]
    fn test_duration_accessors() {
        let retry = RetryConfig::default();
        assert_eq!(retry.base_delay(), Duration::from_millis(500));
        assert_eq!(retry.max_delay(), Duration::from_secs(10));

        let breaker = BreakerConfig::default();
        assert_eq!(breaker.reset_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
            base_url = "https://ci.example.com"
            request_timeout_ms = 5000

            [auth]
            token = { token = "t" }

            [retry]
            enabled = true
            max_retries = 7
            base_delay_ms = 100
            max_delay_ms = 2000
            exponential = false

            [breaker]
            enabled = false
            failure_threshold = 3
            reset_timeout_ms = 1000
            success_threshold = 1

            [paging]
            default_page_size = 10
            max_page_size = 100
            auto_fetch_all = true
            max_pages = 5
        "#;
        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.retry.max_retries, 7);
        assert!(!config.retry.exponential);
        assert!(!config.breaker.enabled);
        assert!(config.paging.auto_fetch_all);
    }
}
