//! Navigation settings of one marketplace.

use std::time::Duration;

use offerscout_core::{AppConfig, Error, Query, Source};
use url::Url;
use url::form_urlencoded::byte_serialize;

use crate::session::ReadyState;

/// What a search that rendered zero offer cards means for a marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyPolicy {
    /// The page says so explicitly; an empty list is a valid answer.
    EmptyList,
    /// "No results" looks the same as a slow render; report it as a
    /// distinct not-found condition.
    NotFound,
}

/// Per-source navigation recipe.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    pub source: Source,
    /// Search URL with `{query}` and optional `{page}` placeholders.
    pub search_url: String,
    /// Pages navigated sequentially per query.
    pub pages: u32,
    pub ready: ReadyState,
    pub consent_selector: Option<&'static str>,
    pub empty: EmptyPolicy,
    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
    pub settle: Duration,
}

impl SourceProfile {
    pub fn from_config(source: Source, config: &AppConfig) -> Self {
        let settings = config.source(source);
        let (ready, consent_selector, empty) = match source {
            Source::Auction => (ReadyState::Loaded, Some("#gdpr-banner-accept"), EmptyPolicy::NotFound),
            // Grid items stream in through XHR after the load event.
            Source::Classifieds => {
                (ReadyState::NetworkIdle, Some("#onetrust-accept-btn-handler"), EmptyPolicy::NotFound)
            }
            Source::Catalog => (ReadyState::Loaded, Some("#CookiesConsent button"), EmptyPolicy::EmptyList),
        };
        Self {
            source,
            search_url: settings.search_url.clone(),
            pages: settings.pages.max(1),
            ready,
            consent_selector,
            empty,
            navigation_timeout: config.navigation_timeout(),
            selector_timeout: config.selector_timeout(),
            settle: config.settle_delay(),
        }
    }

    /// One URL per page, 1-based, with the normalized query form-encoded.
    pub fn page_urls(&self, query: &Query) -> Result<Vec<Url>, Error> {
        let encoded: String = byte_serialize(query.key().as_bytes()).collect();
        let templated = self.search_url.replace("{query}", &encoded);
        (1..=self.pages)
            .map(|page| {
                let raw = templated.replace("{page}", &page.to_string());
                Url::parse(&raw).map_err(|e| Error::Config(format!("{} search url {raw}: {e}", self.source)))
            })
            .collect()
    }
}
