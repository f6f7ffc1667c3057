//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::Source;
use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn check_timeout(field: &str, value_ms: u64) -> Result<(), ConfigError> {
    if value_ms < 100 {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must be at least 100ms".into() });
    }
    if value_ms > 300_000 {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must not exceed 5 minutes (300000ms)".into() });
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - any timeout is below 100ms or exceeds 5 minutes
    /// - `user_agent` is empty or the viewport has a zero dimension
    /// - a cache TTL is zero
    /// - a source URL template lacks `{query}` or `pages` is outside 1..=10
    ///
    /// Returns `ConfigError::Missing` if `validator_url` is set without a key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_timeout("navigation_timeout_ms", self.navigation_timeout_ms)?;
        check_timeout("selector_timeout_ms", self.selector_timeout_ms)?;
        check_timeout("session_budget_ms", self.session_budget_ms)?;
        check_timeout("validator_timeout_ms", self.validator_timeout_ms)?;

        if self.settle_delay_ms > 30_000 {
            return Err(ConfigError::Invalid {
                field: "settle_delay_ms".into(),
                reason: "must not exceed 30000ms".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(ConfigError::Invalid { field: "viewport".into(), reason: "dimensions must be non-zero".into() });
        }

        if self.search_cache_ttl_secs == 0 || self.catalog_cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid { field: "cache_ttl".into(), reason: "must be greater than 0".into() });
        }

        for source in Source::ALL {
            let cfg = self.source(source);
            if !cfg.search_url.contains("{query}") {
                return Err(ConfigError::Invalid {
                    field: format!("sources.{source}.search_url"),
                    reason: "must contain a {query} placeholder".into(),
                });
            }
            if !(1..=10).contains(&cfg.pages) {
                return Err(ConfigError::Invalid {
                    field: format!("sources.{source}.pages"),
                    reason: "must be between 1 and 10".into(),
                });
            }
            if cfg.pages > 1 && !cfg.search_url.contains("{page}") {
                tracing::warn!(
                    source = %source,
                    pages = cfg.pages,
                    "search_url has no {{page}} placeholder; every page will load the same URL"
                );
            }
        }

        self.validator_credentials()?;

        if self.session_budget_ms < self.navigation_timeout_ms {
            tracing::warn!(
                session_budget_ms = self.session_budget_ms,
                navigation_timeout_ms = self.navigation_timeout_ms,
                "session budget is shorter than a single navigation timeout"
            );
        }

        Ok(())
    }
}
