//! Card-pricing catalog: per-seller listing rows of one product search.

use offerscout_core::RawOffer;
use url::Url;

use super::{Node, OfferExtractor};

/// Copies assumed on offer when a row shows no availability count.
pub const DEFAULT_QUANTITY: &str = "1";

const PRODUCT_LINK: &str = "a[href*='/Products/']";

#[derive(Debug, Default, Clone, Copy)]
pub struct CatalogExtractor;

impl CatalogExtractor {
    fn quantity(card: &Node<'_>) -> String {
        card.text(".col-availability")
            .map(|text| text.chars().filter(char::is_ascii_digit).collect::<String>())
            .filter(|digits| !digits.is_empty())
            .unwrap_or_else(|| DEFAULT_QUANTITY.to_string())
    }
}

impl OfferExtractor for CatalogExtractor {
    fn card_selector(&self) -> &'static str {
        "div[id^='productRow']"
    }

    fn project(&self, card: &Node<'_>, base: &Url) -> RawOffer {
        RawOffer {
            title: card.text(PRODUCT_LINK).unwrap_or_default(),
            price_text: card.text(".col-price").unwrap_or_default(),
            currency_hint: Some("EUR".into()),
            url: card.url_attr(PRODUCT_LINK, "href", base).unwrap_or_default(),
            thumbnail: card
                .url_attr("img", "src", base)
                .or_else(|| card.url_attr("img", "data-echo", base)),
            seller: card.text(".seller-name"),
            condition: card.text(".col-expansion .expansion-name, .article-condition"),
            shipping_text: None,
            sold_date_text: None,
            quantity: Some(Self::quantity(card)),
        }
    }
}
