//! Auction marketplace "sold items" feed.

use offerscout_core::RawOffer;
use url::Url;

use super::{Node, OfferExtractor};

/// Leading feed entries skipped. The sold feed opens with promoted and
/// "results matching fewer words" cards.
pub const SOLD_FEED_SKIP: usize = 2;

/// Maximum number of offers kept from the sold feed.
pub const SOLD_FEED_LIMIT: usize = 12;

const NEW_LISTING_PREFIX: &str = "new listing";

/// Extractor for the auction site's completed-sales result list.
///
/// Result window: offers `SOLD_FEED_SKIP + 1 ..= SOLD_FEED_SKIP + SOLD_FEED_LIMIT`
/// of the feed (the 3rd through 14th card), counted across pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuctionExtractor;

impl AuctionExtractor {
    /// Titles of freshly listed items carry a "New listing" badge inside
    /// the title element.
    fn clean_title(raw: Option<String>) -> String {
        let title = raw.unwrap_or_default();
        match title.get(..NEW_LISTING_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(NEW_LISTING_PREFIX) => {
                title[NEW_LISTING_PREFIX.len()..].trim_start().to_string()
            }
            _ => title,
        }
    }

    /// Item links carry tracking query parameters that differ per render;
    /// the path alone identifies the listing.
    fn clean_url(raw: Option<String>) -> String {
        match raw.as_deref().map(Url::parse) {
            Some(Ok(mut url)) => {
                url.set_query(None);
                url.set_fragment(None);
                url.to_string()
            }
            _ => raw.unwrap_or_default(),
        }
    }
}

impl OfferExtractor for AuctionExtractor {
    fn card_selector(&self) -> &'static str {
        "ul.srp-results > li.s-item"
    }

    fn project(&self, card: &Node<'_>, base: &Url) -> RawOffer {
        RawOffer {
            title: Self::clean_title(card.text(".s-item__title")),
            price_text: card.text(".s-item__price").unwrap_or_default(),
            currency_hint: None,
            url: Self::clean_url(card.url_attr("a.s-item__link", "href", base)),
            thumbnail: card
                .url_attr(".s-item__image-wrapper img", "src", base)
                .or_else(|| card.url_attr(".s-item__image-wrapper img", "data-src", base)),
            seller: card.text(".s-item__seller-info-text"),
            condition: card.text(".SECONDARY_INFO"),
            shipping_text: card.text(".s-item__shipping, .s-item__logisticsCost"),
            sold_date_text: card.text(".s-item__caption--signal, .s-item__title--tag"),
            quantity: None,
        }
    }

    fn window(&self, offers: Vec<RawOffer>) -> Vec<RawOffer> {
        offers.into_iter().skip(SOLD_FEED_SKIP).take(SOLD_FEED_LIMIT).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(i: usize) -> String {
        format!(
            r#"<li class="s-item">
                <div class="s-item__image-wrapper"><img src="https://i.auction.example/{i}.jpg"></div>
                <a class="s-item__link" href="https://www.auction.example/itm/{i}?hash=abc&_trkparms=x">
                    <div class="s-item__title"><span>Booster Box {i}</span></div>
                </a>
                <span class="SECONDARY_INFO">Brand New</span>
                <span class="s-item__price">$1{i}0.00</span>
                <span class="s-item__shipping">+$9.99 shipping</span>
                <span class="s-item__seller-info-text">cardshop{i} (1,024) 99.8%</span>
                <div class="s-item__caption--signal"><span>Sold  Jun {i}, 2025</span></div>
            </li>"#
        )
    }

    fn page(count: usize) -> String {
        let cards: String = (1..=count).map(card).collect();
        format!(r#"<html><body><ul class="srp-results">{cards}</ul></body></html>"#)
    }

    fn base() -> Url {
        Url::parse("https://www.auction.example/sch/i.html?_nkw=booster").unwrap()
    }

    fn windowed(html: &str) -> Vec<RawOffer> {
        AuctionExtractor.window(AuctionExtractor.extract(html, &base()))
    }

    #[test]
    fn test_projects_all_fields() {
        let offers = windowed(&page(3));
        assert_eq!(offers.len(), 1);
        let offer = &offers[0];
        assert_eq!(offer.title, "Booster Box 3");
        assert_eq!(offer.price_text, "$130.00");
        assert_eq!(offer.url, "https://www.auction.example/itm/3");
        assert_eq!(offer.thumbnail.as_deref(), Some("https://i.auction.example/3.jpg"));
        assert_eq!(offer.condition.as_deref(), Some("Brand New"));
        assert_eq!(offer.shipping_text.as_deref(), Some("+$9.99 shipping"));
        assert_eq!(offer.seller.as_deref(), Some("cardshop3 (1,024) 99.8%"));
        assert_eq!(offer.sold_date_text.as_deref(), Some("Sold Jun 3, 2025"));
    }

    #[test]
    fn test_window_keeps_third_through_fourteenth() {
        assert_eq!(AuctionExtractor.extract(&page(20), &base()).len(), 20);
        let offers = windowed(&page(20));
        assert_eq!(offers.len(), SOLD_FEED_LIMIT);
        assert_eq!(offers.first().unwrap().title, "Booster Box 3");
        assert_eq!(offers.last().unwrap().title, "Booster Box 14");
    }

    #[test]
    fn test_short_feed_yields_nothing_after_skip() {
        assert!(windowed(&page(2)).is_empty());
    }

    #[test]
    fn test_missing_fields_do_not_drop_offer() {
        let html = r#"<ul class="srp-results">
            <li class="s-item"></li><li class="s-item"></li>
            <li class="s-item"><div class="s-item__title">Bare</div></li>
        </ul>"#;
        let offers = windowed(html);
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].title, "Bare");
        assert_eq!(offers[0].price_text, "");
        assert_eq!(offers[0].url, "");
        assert!(offers[0].thumbnail.is_none());
    }

    #[test]
    fn test_new_listing_badge_removed() {
        assert_eq!(AuctionExtractor::clean_title(Some("New Listing Elite Trainer Box".into())), "Elite Trainer Box");
        assert_eq!(AuctionExtractor::clean_title(Some("Newest set".into())), "Newest set");
        assert_eq!(AuctionExtractor::clean_title(None), "");
    }

    #[test]
    fn test_lazy_thumbnail_fallback() {
        let html = r#"<ul class="srp-results"><li class="s-item"></li><li class="s-item"></li>
            <li class="s-item"><div class="s-item__image-wrapper"><img data-src="/lazy.jpg"></div></li></ul>"#;
        let offers = windowed(html);
        assert_eq!(offers[0].thumbnail.as_deref(), Some("https://www.auction.example/lazy.jpg"));
    }
}
