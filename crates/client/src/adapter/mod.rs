//! Per-marketplace "fetch offers for query" operations.
//!
//! A [`MarketplaceAdapter`] composes a [`SessionDriver`], an [`OfferExtractor`]
//! and a [`ResultCache`]. Paginated sources navigate their pages one after the
//! other inside a single browser session and concatenate the offers in page
//! order.

mod profile;

pub use profile::{EmptyPolicy, SourceProfile};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use offerscout_core::{AppConfig, Error, Query, RawOffer, ResultCache, Source};
use tokio::time::Instant;
use url::Url;

use crate::extract::{OfferExtractor, extractor_for};
use crate::session::{BrowserSession, SessionDriver, SessionLauncher, dismiss_consent};

/// One marketplace as seen by the route surface and the coordinator.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    /// Offers for `query` in page then document order. A fresh cache entry
    /// is returned without touching the browser unless `force_refresh`.
    async fn fetch_offers(&self, query: &Query, force_refresh: bool) -> Result<Vec<RawOffer>, Error>;

    /// Drop every cached result. Returns the number of entries removed.
    fn clear_cache(&self) -> usize;
}

/// Browser-backed adapter for one marketplace.
pub struct MarketplaceAdapter {
    profile: SourceProfile,
    extractor: Arc<dyn OfferExtractor>,
    driver: SessionDriver,
    cache: ResultCache<Vec<RawOffer>>,
}

impl MarketplaceAdapter {
    pub fn new(
        profile: SourceProfile, extractor: Arc<dyn OfferExtractor>, driver: SessionDriver,
        cache: ResultCache<Vec<RawOffer>>,
    ) -> Self {
        Self { profile, extractor, driver, cache }
    }

    pub fn profile(&self) -> &SourceProfile {
        &self.profile
    }
}

/// Navigate every page URL in order and collect the offers. Stops at the
/// first page without offer cards. The extractor's result window applies to
/// the concatenated feed.
async fn collect_pages(
    session: &mut dyn BrowserSession, profile: &SourceProfile, extractor: &dyn OfferExtractor, urls: &[Url],
) -> Result<Vec<RawOffer>, Error> {
    let mut offers = Vec::new();
    for (index, url) in urls.iter().enumerate() {
        let page = index + 1;
        session.navigate(url, profile.ready, profile.navigation_timeout).await?;

        if index == 0
            && let Some(selector) = profile.consent_selector
        {
            dismiss_consent(session, selector).await;
        }

        // Last resort for client-side rendering that finishes after load.
        if !profile.settle.is_zero() {
            tokio::time::sleep(profile.settle).await;
        }

        if !session.wait_for_selector(extractor.card_selector(), profile.selector_timeout).await? {
            tracing::debug!(source = %profile.source, page, "no offer cards appeared");
            break;
        }

        let html = session.html().await?;
        let found = extractor.extract(&html, url);
        tracing::debug!(source = %profile.source, page, count = found.len(), "extracted page");
        if found.is_empty() {
            break;
        }
        offers.extend(found);
    }
    Ok(extractor.window(offers))
}

#[async_trait]
impl SourceAdapter for MarketplaceAdapter {
    fn source(&self) -> Source {
        self.profile.source
    }

    async fn fetch_offers(&self, query: &Query, force_refresh: bool) -> Result<Vec<RawOffer>, Error> {
        if !force_refresh && let Some(offers) = self.cache.get_fresh(query.key()) {
            return Ok(offers);
        }

        let urls = self.profile.page_urls(query)?;
        let started = Instant::now();
        let profile = self.profile.clone();
        let extractor = Arc::clone(&self.extractor);
        let offers = self
            .driver
            .with_session(move |session| {
                Box::pin(async move { collect_pages(session, &profile, extractor.as_ref(), &urls).await })
            })
            .await?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if offers.is_empty() && self.profile.empty == EmptyPolicy::NotFound {
            tracing::info!(source = %self.profile.source, query = %query, elapsed_ms, "no offers found");
            return Err(Error::NoOffersFound(format!("no {} offers for \"{query}\"", self.profile.source)));
        }

        self.cache.set(query.key(), offers.clone());
        tracing::info!(source = %self.profile.source, query = %query, count = offers.len(), elapsed_ms, "fetched offers");
        Ok(offers)
    }

    fn clear_cache(&self) -> usize {
        self.cache.clear()
    }
}

/// Launcher for the configured build: headless Chromium when rendering is
/// compiled in.
pub fn default_launcher(config: &AppConfig) -> Arc<dyn SessionLauncher> {
    #[cfg(feature = "render")]
    {
        use crate::session::{ChromiumLauncher, LaunchOptions};
        Arc::new(ChromiumLauncher::new(LaunchOptions::from_config(config)))
    }
    #[cfg(not(feature = "render"))]
    {
        let _ = config;
        Arc::new(crate::session::UnavailableLauncher)
    }
}

/// One adapter per source, sharing a launcher.
pub fn build_adapters(
    config: &AppConfig, launcher: Arc<dyn SessionLauncher>,
) -> HashMap<Source, Arc<dyn SourceAdapter>> {
    let driver = SessionDriver::new(launcher, config.session_budget());
    Source::ALL
        .into_iter()
        .map(|source| {
            let adapter = MarketplaceAdapter::new(
                SourceProfile::from_config(source, config),
                extractor_for(source),
                driver.clone(),
                ResultCache::new(source.as_str(), config.cache_ttl(source)),
            );
            (source, Arc::new(adapter) as Arc<dyn SourceAdapter>)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::session::testing::{Counters, FakeLauncher};

    fn auction_card(i: usize) -> String {
        format!(
            r#"<li class="s-item"><a class="s-item__link" href="https://www.auction.example/itm/{i}">
               <div class="s-item__title">Elite Trainer Box {i}</div></a>
               <span class="s-item__price">${i}5.00</span>
               <div class="s-item__image-wrapper"><img src="https://i.auction.example/{i}.jpg"></div></li>"#
        )
    }

    fn auction_page(range: std::ops::RangeInclusive<usize>) -> String {
        let cards: String = range.map(auction_card).collect();
        format!(r#"<html><body><ul class="srp-results">{cards}</ul></body></html>"#)
    }

    fn profile(source: Source, pages: u32, empty: EmptyPolicy) -> SourceProfile {
        SourceProfile {
            source,
            search_url: "https://market.example/search?q={query}&page={page}".into(),
            pages,
            ready: crate::session::ReadyState::Loaded,
            consent_selector: Some("#accept"),
            empty,
            navigation_timeout: Duration::from_secs(1),
            selector_timeout: Duration::from_millis(10),
            settle: Duration::ZERO,
        }
    }

    fn url(page: u32) -> String {
        format!("https://market.example/search?q=elite+trainer+box&page={page}")
    }

    fn adapter(profile: SourceProfile, launcher: FakeLauncher) -> (MarketplaceAdapter, Arc<Counters>) {
        let counters = launcher.counters.clone();
        let extractor = extractor_for(profile.source);
        let driver = SessionDriver::new(Arc::new(launcher), Duration::from_secs(5));
        let cache = ResultCache::new(profile.source.as_str(), Duration::from_secs(600));
        (MarketplaceAdapter::new(profile, extractor, driver, cache), counters)
    }

    fn query() -> Query {
        Query::new("  Elite   Trainer BOX ").unwrap()
    }

    #[tokio::test]
    async fn test_fetch_and_release() {
        let launcher = FakeLauncher::new([(url(1), auction_page(1..=5))]);
        let (adapter, counters) = adapter(profile(Source::Auction, 1, EmptyPolicy::NotFound), launcher);

        let offers = adapter.fetch_offers(&query(), false).await.unwrap();
        let titles: Vec<_> = offers.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(titles, ["Elite Trainer Box 3", "Elite Trainer Box 4", "Elite Trainer Box 5"]);
        assert_eq!(offers[0].thumbnail.as_deref(), Some("https://i.auction.example/3.jpg"));
        assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_browser() {
        let launcher = FakeLauncher::new([(url(1), auction_page(1..=4))]);
        let (adapter, counters) = adapter(profile(Source::Auction, 1, EmptyPolicy::NotFound), launcher);

        let first = adapter.fetch_offers(&query(), false).await.unwrap();
        let second = adapter.fetch_offers(&Query::new("elite trainer box").unwrap(), false).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(counters.launched.load(Ordering::SeqCst), 1);

        adapter.fetch_offers(&query(), true).await.unwrap();
        assert_eq!(counters.launched.load(Ordering::SeqCst), 2);

        assert_eq!(adapter.clear_cache(), 1);
        adapter.fetch_offers(&query(), false).await.unwrap();
        assert_eq!(counters.launched.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_pages_concatenate_in_order() {
        let launcher = FakeLauncher::new([(url(1), auction_page(1..=3)), (url(2), auction_page(11..=14))]);
        let (adapter, counters) = adapter(profile(Source::Auction, 2, EmptyPolicy::NotFound), launcher);

        let offers = adapter.fetch_offers(&query(), false).await.unwrap();
        let titles: Vec<_> = offers.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(
            titles,
            ["Elite Trainer Box 3", "Elite Trainer Box 11", "Elite Trainer Box 12", "Elite Trainer Box 13", "Elite Trainer Box 14"]
        );
        assert_eq!(*counters.navigations.lock().unwrap(), [url(1), url(2)]);
        assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_result_window_spans_pages() {
        let launcher = FakeLauncher::new([(url(1), auction_page(1..=10)), (url(2), auction_page(21..=30))]);
        let (adapter, _) = adapter(profile(Source::Auction, 2, EmptyPolicy::NotFound), launcher);

        let offers = adapter.fetch_offers(&query(), false).await.unwrap();
        assert_eq!(offers.len(), 12);
        assert_eq!(offers.first().unwrap().title, "Elite Trainer Box 3");
        assert_eq!(offers[8].title, "Elite Trainer Box 21");
        assert_eq!(offers.last().unwrap().title, "Elite Trainer Box 24");
    }

    #[tokio::test]
    async fn test_empty_page_stops_pagination() {
        let empty = "<html><body><p>Nothing here</p></body></html>".to_string();
        let launcher =
            FakeLauncher::new([(url(1), auction_page(1..=4)), (url(2), empty), (url(3), auction_page(1..=4))]);
        let (adapter, counters) = adapter(profile(Source::Auction, 3, EmptyPolicy::NotFound), launcher);

        let offers = adapter.fetch_offers(&query(), false).await.unwrap();
        assert_eq!(offers.len(), 2);
        assert_eq!(counters.navigations.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_nodes_is_no_offers_found() {
        let blank = "<html><body><ul class=\"srp-results\"></ul></body></html>".to_string();
        let launcher = FakeLauncher::new([(url(1), blank)]);
        let (adapter, counters) = adapter(profile(Source::Auction, 1, EmptyPolicy::NotFound), launcher);

        let err = adapter.fetch_offers(&query(), false).await.unwrap_err();
        assert!(matches!(err, Error::NoOffersFound(_)));
        assert_eq!(err.http_status(), 404);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_nodes_empty_list_policy() {
        let blank = "<html><body></body></html>".to_string();
        let launcher = FakeLauncher::new([(url(1), blank)]);
        let (adapter, _) = adapter(profile(Source::Catalog, 1, EmptyPolicy::EmptyList), launcher);

        assert!(adapter.fetch_offers(&query(), false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_navigation_failure_propagates_and_releases() {
        let launcher = FakeLauncher::new(Vec::<(String, String)>::new());
        let (adapter, counters) = adapter(profile(Source::Auction, 1, EmptyPolicy::NotFound), launcher);

        let err = adapter.fetch_offers(&query(), false).await.unwrap_err();
        assert!(matches!(err, Error::Navigation(_)));
        assert_eq!(err.http_status(), 500);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_consent_clicked_on_first_page_only() {
        let with_banner = |range| auction_page(range).replace("<body>", r#"<body><button id="accept">OK</button>"#);
        let launcher = FakeLauncher::new([(url(1), with_banner(1..=4)), (url(2), with_banner(1..=4))]);
        let (adapter, counters) = adapter(profile(Source::Auction, 2, EmptyPolicy::NotFound), launcher);

        adapter.fetch_offers(&query(), false).await.unwrap();
        assert_eq!(counters.clicks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_build_adapters_covers_sources() {
        let adapters = build_adapters(&AppConfig::default(), Arc::new(crate::session::UnavailableLauncher));
        for source in Source::ALL {
            assert_eq!(adapters[&source].source(), source);
        }
    }
}
