//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFERSCOUT_*, nested keys split on `__`)
//! 2. TOML config file (if OFFERSCOUT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::Source;

mod validation;

pub use validation::ConfigError;

/// Which surface the server binary exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// axum HTTP routes.
    #[default]
    Http,
    /// MCP tools over stdio.
    Stdio,
}

/// Per-marketplace navigation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Search URL template. `{query}` is replaced with the URL-encoded query,
    /// `{page}` with the 1-based page index.
    pub search_url: String,

    /// Number of result pages visited sequentially per query.
    #[serde(default = "default_pages")]
    pub pages: u32,
}

fn default_pages() -> u32 {
    1
}

/// Navigation settings for every source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub auction: SourceConfig,
    pub classifieds: SourceConfig,
    pub catalog: SourceConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            auction: SourceConfig {
                search_url: "https://www.ebay.com/sch/i.html?_nkw={query}&LH_Sold=1&LH_Complete=1&_pgn={page}".into(),
                pages: 1,
            },
            classifieds: SourceConfig {
                search_url: "https://www.vinted.fr/catalog?search_text={query}&order=price_low_to_high&page={page}"
                    .into(),
                pages: 3,
            },
            catalog: SourceConfig {
                search_url: "https://www.cardmarket.com/en/Pokemon/Products/Search?searchString={query}&mode=list&site={page}"
                    .into(),
                pages: 1,
            },
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFERSCOUT_*)
/// 2. TOML config file (if OFFERSCOUT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Surface exposed by the server binary.
    ///
    /// Set via OFFERSCOUT_TRANSPORT environment variable.
    #[serde(default)]
    pub transport: Transport,

    /// HTTP bind address.
    ///
    /// Set via OFFERSCOUT_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// User-Agent presented by browser sessions.
    ///
    /// Set via OFFERSCOUT_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Accept-Language presented by browser sessions.
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Explicit Chrome/Chromium binary. Auto-detected when unset.
    ///
    /// Set via OFFERSCOUT_CHROME_EXECUTABLE environment variable.
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,

    /// Bound on a single navigation, in milliseconds.
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Bound on waiting for the offer-card selector, in milliseconds.
    #[serde(default = "default_selector_timeout_ms")]
    pub selector_timeout_ms: u64,

    /// Fixed settle delay after navigation, in milliseconds.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Deadline for a whole browser session, in milliseconds.
    #[serde(default = "default_session_budget_ms")]
    pub session_budget_ms: u64,

    /// TTL for marketplace search results, in seconds.
    #[serde(default = "default_search_cache_ttl_secs")]
    pub search_cache_ttl_secs: u64,

    /// TTL for catalog results, in seconds.
    #[serde(default = "default_catalog_cache_ttl_secs")]
    pub catalog_cache_ttl_secs: u64,

    /// External offer validator endpoint.
    ///
    /// Set via OFFERSCOUT_VALIDATOR_URL environment variable.
    #[serde(default)]
    pub validator_url: Option<String>,

    /// Bearer token for the validator. Required when `validator_url` is set.
    ///
    /// Set via OFFERSCOUT_VALIDATOR_API_KEY environment variable.
    #[serde(default)]
    pub validator_api_key: Option<String>,

    #[serde(default = "default_validator_timeout_ms")]
    pub validator_timeout_ms: u64,

    /// Per-marketplace navigation settings.
    #[serde(default)]
    pub sources: SourcesConfig,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8787".into()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
        .into()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".into()
}

fn default_viewport_width() -> u32 {
    1366
}

fn default_viewport_height() -> u32 {
    768
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_selector_timeout_ms() -> u64 {
    5_000
}

fn default_settle_delay_ms() -> u64 {
    1_500
}

fn default_session_budget_ms() -> u64 {
    90_000
}

fn default_search_cache_ttl_secs() -> u64 {
    600
}

fn default_catalog_cache_ttl_secs() -> u64 {
    1_800
}

fn default_validator_timeout_ms() -> u64 {
    15_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            listen_addr: default_listen_addr(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            chrome_executable: None,
            navigation_timeout_ms: default_navigation_timeout_ms(),
            selector_timeout_ms: default_selector_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            session_budget_ms: default_session_budget_ms(),
            search_cache_ttl_secs: default_search_cache_ttl_secs(),
            catalog_cache_ttl_secs: default_catalog_cache_ttl_secs(),
            validator_url: None,
            validator_api_key: None,
            validator_timeout_ms: default_validator_timeout_ms(),
            sources: SourcesConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn session_budget(&self) -> Duration {
        Duration::from_millis(self.session_budget_ms)
    }

    pub fn validator_timeout(&self) -> Duration {
        Duration::from_millis(self.validator_timeout_ms)
    }

    /// Navigation settings for one source.
    pub fn source(&self, source: Source) -> &SourceConfig {
        match source {
            Source::Auction => &self.sources.auction,
            Source::Classifieds => &self.sources.classifieds,
            Source::Catalog => &self.sources.catalog,
        }
    }

    /// Cache TTL for one source: catalog data moves slower than search feeds.
    pub fn cache_ttl(&self, source: Source) -> Duration {
        match source {
            Source::Catalog => Duration::from_secs(self.catalog_cache_ttl_secs),
            Source::Auction | Source::Classifieds => Duration::from_secs(self.search_cache_ttl_secs),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFERSCOUT_`
    /// 2. TOML file from `OFFERSCOUT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFERSCOUT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFERSCOUT_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validator endpoint and key, if a validator is configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if a URL is set without an API key.
    pub fn validator_credentials(&self) -> Result<Option<(&str, &str)>, ConfigError> {
        match (self.validator_url.as_deref(), self.validator_api_key.as_deref()) {
            (None, _) => Ok(None),
            (Some(url), Some(key)) if !key.is_empty() => Ok(Some((url, key))),
            (Some(_), _) => Err(ConfigError::Missing {
                field: "validator_api_key".into(),
                hint: "Set OFFERSCOUT_VALIDATOR_API_KEY environment variable".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.transport, Transport::Http);
        assert_eq!(config.listen_addr, "127.0.0.1:8787");
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
        assert_eq!((config.viewport_width, config.viewport_height), (1366, 768));
        assert_eq!(config.selector_timeout_ms, 5_000);
        assert_eq!(config.search_cache_ttl_secs, 600);
        assert_eq!(config.catalog_cache_ttl_secs, 1_800);
        assert!(config.validator_url.is_none());
        assert_eq!(config.sources.classifieds.pages, 3);
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.navigation_timeout(), Duration::from_secs(30));
        assert_eq!(config.selector_timeout(), Duration::from_secs(5));
        assert_eq!(config.cache_ttl(Source::Auction), Duration::from_secs(600));
        assert_eq!(config.cache_ttl(Source::Catalog), Duration::from_secs(1800));
    }

    #[test]
    fn test_validator_credentials_absent() {
        let config = AppConfig::default();
        assert!(config.validator_credentials().unwrap().is_none());
    }

    #[test]
    fn test_validator_credentials_missing_key() {
        let config = AppConfig { validator_url: Some("https://validator.example/v1".into()), ..Default::default() };
        assert!(matches!(config.validator_credentials(), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_validator_credentials_present() {
        let config = AppConfig {
            validator_url: Some("https://validator.example/v1".into()),
            validator_api_key: Some("secret".into()),
            ..Default::default()
        };
        assert_eq!(
            config.validator_credentials().unwrap(),
            Some(("https://validator.example/v1", "secret"))
        );
    }

    #[test]
    fn test_load_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("OFFERSCOUT_TRANSPORT", "stdio");
            jail.set_env("OFFERSCOUT_SELECTOR_TIMEOUT_MS", "2500");
            jail.set_env("OFFERSCOUT_SOURCES__CLASSIFIEDS__PAGES", "5");
            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.transport, Transport::Stdio);
            assert_eq!(config.selector_timeout_ms, 2500);
            assert_eq!(config.sources.classifieds.pages, 5);
            assert_eq!(config.sources.auction, SourcesConfig::default().auction);
            Ok(())
        });
    }

    #[test]
    fn test_load_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "offerscout.toml",
                r#"
                    search_cache_ttl_secs = 120

                    [sources.catalog]
                    search_url = "https://catalog.example/search?q={query}"
                "#,
            )?;
            jail.set_env("OFFERSCOUT_CONFIG_FILE", "offerscout.toml");
            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.search_cache_ttl_secs, 120);
            assert_eq!(config.sources.catalog.search_url, "https://catalog.example/search?q={query}");
            assert_eq!(config.sources.catalog.pages, 1);
            Ok(())
        });
    }
}
