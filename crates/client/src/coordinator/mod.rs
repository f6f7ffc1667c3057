//! Request coordination for one logical search slot.
//!
//! ### State machine
//! - `Idle -> Fetching -> {Succeeded, Failed, Cancelled}` per slot, published
//!   on a [`watch`] channel.
//! - A request for the query already in flight is suppressed.
//! - A request for a different query cancels the one in flight first.
//!
//! ### Pipeline
//! - Fresh cached result for the normalized query: returned without network
//!   work (unless forced).
//! - Otherwise fetch raw offers, normalize, validate, reconcile against the
//!   pre-validation candidates, sort by price and summarize.
//! - An unreachable validator degrades to the unvalidated offers, flagged
//!   `validated: false`. That degraded result is not cached, so the next
//!   search asks the validator again.
//! - Cancellation resolves to [`SearchOutcome::Cancelled`], never to a
//!   failure.

pub mod reconcile;
pub mod source;

pub use reconcile::{PriceSummary, reconcile, sort_by_price};
pub use source::{DirectSource, HttpOfferSource, OfferSource};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use offerscout_core::{Error, NormalizedOffer, Query, Rejection, ResultCache};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::validator::OfferValidator;

/// Reconciled, price-sorted offers for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub query: String,
    pub offers: Vec<NormalizedOffer>,
    pub rejected: Vec<Rejection>,
    /// Whether the external validator vetted `offers`.
    pub validated: bool,
    pub summary: PriceSummary,
}

/// How one search call ended.
#[derive(Debug)]
pub enum SearchOutcome {
    Succeeded(SearchResult),
    Failed(Error),
    /// Superseded by a newer search or cancelled explicitly.
    Cancelled,
    /// The same normalized query was already in flight.
    Suppressed,
}

/// Observable slot state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlotState {
    #[default]
    Idle,
    Fetching {
        query: String,
    },
    Succeeded {
        query: String,
        count: usize,
    },
    Failed {
        query: String,
        error: String,
    },
    Cancelled {
        query: String,
    },
}

struct InFlight {
    id: u64,
    key: String,
    token: CancellationToken,
}

/// Deduplicating, cancelling front of an [`OfferSource`].
pub struct SearchCoordinator {
    source: Arc<dyn OfferSource>,
    validator: Option<Arc<dyn OfferValidator>>,
    cache: Arc<ResultCache<SearchResult>>,
    slot: Mutex<Option<InFlight>>,
    next_id: AtomicU64,
    state: watch::Sender<SlotState>,
}

impl SearchCoordinator {
    pub fn new(source: Arc<dyn OfferSource>, validator: Option<Arc<dyn OfferValidator>>, ttl: Duration) -> Self {
        Self::with_cache(source, validator, Arc::new(ResultCache::new("coordinator", ttl)))
    }

    /// A coordinator with its own slot over a settled-result cache that may
    /// be shared with other coordinators.
    pub fn with_cache(
        source: Arc<dyn OfferSource>, validator: Option<Arc<dyn OfferValidator>>, cache: Arc<ResultCache<SearchResult>>,
    ) -> Self {
        Self {
            source,
            validator,
            cache,
            slot: Mutex::new(None),
            next_id: AtomicU64::new(0),
            state: watch::Sender::new(SlotState::Idle),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SlotState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SlotState {
        self.state.borrow().clone()
    }

    /// Cancel whatever is in flight. Returns whether anything was.
    pub fn cancel(&self) -> bool {
        let taken = self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        match taken {
            Some(in_flight) => {
                in_flight.token.cancel();
                self.state.send_replace(SlotState::Cancelled { query: in_flight.key });
                true
            }
            None => false,
        }
    }

    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    /// Claim the slot for `key`, cancelling a different query in flight.
    /// `None` when `key` itself is already in flight.
    fn claim(&self, key: &str) -> Option<(u64, CancellationToken)> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(in_flight) = slot.as_ref() {
            if in_flight.key == key {
                return None;
            }
            tracing::debug!(previous = %in_flight.key, next = key, "superseding in-flight search");
            in_flight.token.cancel();
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        *slot = Some(InFlight { id, key: key.to_string(), token: token.clone() });
        self.state.send_replace(SlotState::Fetching { query: key.to_string() });
        Some((id, token))
    }

    /// Release the slot if `id` still owns it and publish the final state.
    fn finish(&self, id: u64, key: &str, outcome: SearchOutcome) -> SearchOutcome {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|in_flight| in_flight.id == id) {
            *slot = None;
            let query = key.to_string();
            let state = match &outcome {
                SearchOutcome::Succeeded(result) => SlotState::Succeeded { query, count: result.offers.len() },
                SearchOutcome::Failed(e) => SlotState::Failed { query, error: e.to_string() },
                SearchOutcome::Cancelled => SlotState::Cancelled { query },
                SearchOutcome::Suppressed => return outcome,
            };
            self.state.send_replace(state);
        }
        outcome
    }

    /// Run one search through the slot.
    pub async fn search(&self, raw: &str, force_refresh: bool) -> SearchOutcome {
        let query = match Query::new(raw) {
            Ok(query) => query,
            Err(e) => return SearchOutcome::Failed(e),
        };
        let Some((id, token)) = self.claim(query.key()) else {
            tracing::debug!(query = %query, "duplicate search suppressed");
            return SearchOutcome::Suppressed;
        };

        if !force_refresh && let Some(cached) = self.cache.get_fresh(query.key()) {
            return self.finish(id, query.key(), SearchOutcome::Succeeded(cached));
        }

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => SearchOutcome::Cancelled,
            result = self.run(&query, force_refresh, &token) => match result {
                Ok(result) => SearchOutcome::Succeeded(result),
                Err(e) if e.is_cancelled() => SearchOutcome::Cancelled,
                Err(e) => SearchOutcome::Failed(e),
            },
        };
        self.finish(id, query.key(), outcome)
    }

    async fn run(&self, query: &Query, force_refresh: bool, token: &CancellationToken) -> Result<SearchResult, Error> {
        let raw = self.source.fetch(query, force_refresh, token).await?;
        let candidates: Vec<NormalizedOffer> = raw.into_iter().map(NormalizedOffer::from_raw).collect();

        let (mut offers, rejected, validated) = match &self.validator {
            None => (candidates, Vec::new(), false),
            Some(validator) => match validator.validate(query, &candidates).await {
                Ok(decision) => (reconcile(&candidates, decision.valid), decision.rejected, true),
                Err(e) => {
                    tracing::warn!(query = %query, "serving unvalidated offers: {e}");
                    (candidates, Vec::new(), false)
                }
            },
        };

        sort_by_price(&mut offers);
        let summary = PriceSummary::from_offers(&offers);
        let result = SearchResult { query: query.key().to_string(), offers, rejected, validated, summary };
        if validated || self.validator.is_none() {
            self.cache.set(query.key(), result.clone());
        }
        tracing::info!(query = %query, count = result.offers.len(), validated, "search settled");
        Ok(result)
    }
}
