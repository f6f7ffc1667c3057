//! Rejoining validator verdicts with the original offers, then ordering and
//! summarizing them.

use std::cmp::Ordering;
use std::collections::HashMap;

use offerscout_core::NormalizedOffer;
use serde::Serialize;

/// Replace every validator-approved record with the richer pre-validation
/// candidate it came from.
///
/// Lookup is by exact URL, then by exact title. A record that matches
/// neither is kept as the validator returned it.
pub fn reconcile(candidates: &[NormalizedOffer], valid: Vec<NormalizedOffer>) -> Vec<NormalizedOffer> {
    let mut by_url: HashMap<&str, &NormalizedOffer> = HashMap::new();
    let mut by_title: HashMap<&str, &NormalizedOffer> = HashMap::new();
    for candidate in candidates {
        if !candidate.offer.url.is_empty() {
            by_url.entry(candidate.offer.url.as_str()).or_insert(candidate);
        }
        if !candidate.offer.title.is_empty() {
            by_title.entry(candidate.offer.title.as_str()).or_insert(candidate);
        }
    }

    valid
        .into_iter()
        .map(|approved| {
            let original = by_url
                .get(approved.offer.url.as_str())
                .or_else(|| by_title.get(approved.offer.title.as_str()));
            match original {
                Some(original) => (*original).clone(),
                None => {
                    tracing::debug!(url = %approved.offer.url, "validator record has no original; keeping it verbatim");
                    approved
                }
            }
        })
        .collect()
}

fn price_order(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Ascending by parsed price, unparseable prices last. Stable, so equal
/// prices keep extraction order.
pub fn sort_by_price(offers: &mut [NormalizedOffer]) {
    offers.sort_by(|a, b| price_order(a.price, b.price));
}

/// Statistics over the offers with a parseable price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PriceSummary {
    /// All offers, priced or not.
    pub count: usize,
    /// Offers contributing to the statistics.
    pub priced: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub average: Option<f64>,
}

impl PriceSummary {
    pub fn from_offers(offers: &[NormalizedOffer]) -> Self {
        let prices: Vec<f64> = offers.iter().filter_map(|o| o.price).collect();
        if prices.is_empty() {
            return Self { count: offers.len(), ..Self::default() };
        }
        let sum: f64 = prices.iter().sum();
        Self {
            count: offers.len(),
            priced: prices.len(),
            min: prices.iter().copied().reduce(f64::min),
            max: prices.iter().copied().reduce(f64::max),
            average: Some(sum / prices.len() as f64),
        }
    }
}
