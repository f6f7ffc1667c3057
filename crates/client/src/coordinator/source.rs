//! Where the coordinator gets raw offers from.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use offerscout_core::{Error, Query, RawOffer, Source};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::adapter::SourceAdapter;

/// A cancellable "fetch offers for query" call.
#[async_trait]
pub trait OfferSource: Send + Sync {
    /// Resolves to [`Error::Cancelled`] once `cancel` fires.
    async fn fetch(&self, query: &Query, force_refresh: bool, cancel: &CancellationToken)
    -> Result<Vec<RawOffer>, Error>;
}

/// In-process adapter call. Cancelling drops the adapter future, which tears
/// its browser session down.
pub struct DirectSource {
    adapter: Arc<dyn SourceAdapter>,
}

impl DirectSource {
    pub fn new(adapter: Arc<dyn SourceAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl OfferSource for DirectSource {
    async fn fetch(
        &self, query: &Query, force_refresh: bool, cancel: &CancellationToken,
    ) -> Result<Vec<RawOffer>, Error> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = self.adapter.fetch_offers(query, force_refresh) => result,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OffersBody {
    offers: Vec<RawOffer>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// The search route of a remote offerscout server.
#[derive(Debug, Clone)]
pub struct HttpOfferSource {
    http: reqwest::Client,
    base_url: Url,
    source: Source,
}

impl HttpOfferSource {
    pub fn new(base_url: Url, source: Source, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("offer source client: {e}")))?;
        Ok(Self { http, base_url, source })
    }

    fn search_url(&self) -> Result<Url, Error> {
        self.base_url
            .join(&format!("api/{}/search", self.source))
            .map_err(|e| Error::Config(format!("offer source url: {e}")))
    }

    async fn request(&self, query: &Query, force_refresh: bool) -> Result<Vec<RawOffer>, Error> {
        let mut request = self.http.get(self.search_url()?).query(&[("q", query.raw())]);
        if force_refresh {
            request = request.query(&[("force_refresh", "true")]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("{} search timed out", self.source))
            } else {
                Error::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| Error::HttpError(e.to_string()))?;
        if status.is_success() {
            let body: OffersBody =
                serde_json::from_slice(&bytes).map_err(|e| Error::HttpError(format!("unreadable offers: {e}")))?;
            return Ok(body.offers);
        }

        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
        Err(match status.as_u16() {
            400 => Error::InvalidInput(message),
            404 => Error::NoOffersFound(message),
            _ => Error::HttpError(message),
        })
    }
}

#[async_trait]
impl OfferSource for HttpOfferSource {
    async fn fetch(
        &self, query: &Query, force_refresh: bool, cancel: &CancellationToken,
    ) -> Result<Vec<RawOffer>, Error> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = self.request(query, force_refresh) => result,
        }
    }
}
