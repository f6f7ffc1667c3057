//! Offer records flowing through the pipeline.
//!
//! An extractor produces [`RawOffer`]s in DOM document order. The coordinator
//! turns them into [`NormalizedOffer`]s, sends a reduced [`OfferProjection`] to
//! the external validator and receives a [`ValidationDecision`] back.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::price::parse_price;

/// One marketplace listing as read from a single DOM node.
///
/// Every field except `title` and `url` may be missing on the page; a missing
/// field never causes the offer to be dropped. `url` is the join key back to
/// this record after validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct RawOffer {
    pub title: String,
    pub price_text: String,
    pub currency_hint: Option<String>,
    pub url: String,
    pub thumbnail: Option<String>,
    pub seller: Option<String>,
    pub condition: Option<String>,
    pub shipping_text: Option<String>,
    pub sold_date_text: Option<String>,
    /// Copies on offer (catalog listings only).
    pub quantity: Option<String>,
}

/// ISO currency of a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Currency {
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "GBP")]
    Gbp,
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl Currency {
    /// Resolve a currency from an extractor hint, falling back to symbols
    /// found in the price text.
    pub fn detect(hint: Option<&str>, price_text: &str) -> Self {
        if let Some(currency) = hint.and_then(Self::from_token) {
            return currency;
        }
        Self::from_token(price_text).unwrap_or_default()
    }

    fn from_token(text: &str) -> Option<Self> {
        let upper = text.to_uppercase();
        if upper.contains('€') || upper.contains("EUR") || text.contains("â‚¬") {
            Some(Currency::Eur)
        } else if upper.contains('£') || upper.contains("GBP") {
            Some(Currency::Gbp)
        } else if upper.contains('$') || upper.contains("USD") {
            Some(Currency::Usd)
        } else {
            None
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
            Currency::Unknown => "UNKNOWN",
        }
    }
}

/// A [`RawOffer`] with its parsed price and normalized currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedOffer {
    #[serde(flatten)]
    pub offer: RawOffer,
    /// Parsed price, `None` when the price text is unparseable.
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Currency,
}

impl NormalizedOffer {
    pub fn from_raw(offer: RawOffer) -> Self {
        let price = parse_price(&offer.price_text);
        let currency = Currency::detect(offer.currency_hint.as_deref(), &offer.price_text);
        Self { offer, price, currency }
    }

    /// The reduced projection the external validator works on.
    pub fn projection(&self) -> OfferProjection {
        OfferProjection { title: self.offer.title.clone(), price: self.price, url: self.offer.url.clone() }
    }
}

/// Title, price and URL: the only fields the external validator sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OfferProjection {
    pub title: String,
    pub price: Option<f64>,
    pub url: String,
}

/// A candidate the validator refused, with its stated reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Rejection {
    pub title: String,
    pub reason: String,
}

/// The external classifier's verdict over a candidate batch.
///
/// `valid` entries only carry what the validator echoed back (typically the
/// projection fields); reconciliation rejoins them with the original records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ValidationDecision {
    pub valid: Vec<NormalizedOffer>,
    pub rejected: Vec<Rejection>,
}
