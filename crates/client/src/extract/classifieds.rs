//! Peer-to-peer classifieds marketplace catalog grid.

use std::sync::LazyLock;

use offerscout_core::RawOffer;
use regex::Regex;
use url::Url;

use super::{Node, OfferExtractor};

/// Amount with a leading or trailing currency marker: `45,00 €`, `€45`,
/// `1 299,00 EUR`, `$12.50`. A space or NBSP only groups exactly three digits.
static PRICE_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[€$£]\s?\d+(?:[.,]\d+|[\x{A0} ]\d{3})*|\d+(?:[.,]\d+|[\x{A0} ]\d{3})*\s?(?:€|EUR|\$|£))")
        .expect("price pattern is valid")
});

/// Pick the listing price out of a card's combined display text.
///
/// The overlay text lists every amount shown on the card. When it carries
/// more than one price-like substring the second one is taken, otherwise the
/// first.
pub fn pick_listing_price(text: &str) -> Option<String> {
    let mut matches = PRICE_LIKE.find_iter(text).map(|m| m.as_str().trim().to_string());
    let first = matches.next()?;
    Some(matches.next().unwrap_or(first))
}

/// Extractor for the classifieds catalog grid.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassifiedsExtractor;

const OVERLAY: &str = "a.new-item-box__overlay";

impl OfferExtractor for ClassifiedsExtractor {
    fn card_selector(&self) -> &'static str {
        "div.feed-grid__item"
    }

    fn project(&self, card: &Node<'_>, base: &Url) -> RawOffer {
        let overlay_text = card.attr(OVERLAY, "title");

        let title = card
            .text("[data-testid$='--description-title']")
            .or_else(|| {
                overlay_text
                    .as_deref()
                    .and_then(|t| t.split(", ").next())
                    .map(str::to_string)
            })
            .unwrap_or_default();

        let price_text = overlay_text
            .as_deref()
            .and_then(pick_listing_price)
            .or_else(|| card.text("[data-testid$='--price-text']"))
            .unwrap_or_default();

        RawOffer {
            title,
            price_text,
            currency_hint: Some("EUR".into()),
            url: card.url_attr(OVERLAY, "href", base).unwrap_or_default(),
            thumbnail: card.url_attr("img", "src", base),
            seller: card.text("[data-testid$='--owner-name']"),
            condition: card.text("[data-testid$='--description-subtitle']"),
            shipping_text: None,
            sold_date_text: None,
            quantity: None,
        }
    }
}
