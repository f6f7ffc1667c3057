//! Marketplace-specific DOM to offer mapping.
//!
//! ### Node-query capability
//! - Extractors read pages through [`Document`]/[`Node`] only: select-all,
//!   text-read, attribute-read, all null-safe.
//!
//! ### Projection
//! - Each marketplace implements [`OfferExtractor`]: a stable structural
//!   selector for its offer cards and a typed projection from one card to a
//!   [`RawOffer`]. A missing field yields `None` (or its documented default),
//!   never an error and never a dropped offer.
//!
//! ### Result window
//! - Offers keep DOM document order. A marketplace may declare a bounded
//!   window over its whole feed (see [`AuctionExtractor`]). The window is
//!   applied once, after every page has been concatenated.

pub mod auction;
pub mod catalog;
pub mod classifieds;
pub mod document;

pub use auction::AuctionExtractor;
pub use catalog::CatalogExtractor;
pub use classifieds::ClassifiedsExtractor;
pub use document::{Document, Node};

use std::sync::Arc;

use offerscout_core::{RawOffer, Source};
use url::Url;

/// Typed projection of one marketplace's rendered search page.
pub trait OfferExtractor: Send + Sync {
    /// Structural selector of the repeated offer-card node.
    fn card_selector(&self) -> &'static str;

    /// Project one card into an offer. Must be total.
    fn project(&self, card: &Node<'_>, base: &Url) -> RawOffer;

    /// Result-window policy over the concatenated offers of every page.
    fn window(&self, offers: Vec<RawOffer>) -> Vec<RawOffer> {
        offers
    }

    /// Extract every offer card from a rendered page, in document order.
    fn extract(&self, html: &str, base: &Url) -> Vec<RawOffer> {
        let doc = Document::parse(html);
        doc.select_all(self.card_selector())
            .iter()
            .map(|card| self.project(card, base))
            .collect()
    }
}

/// The extractor for a source.
pub fn extractor_for(source: Source) -> Arc<dyn OfferExtractor> {
    match source {
        Source::Auction => Arc::new(AuctionExtractor),
        Source::Classifieds => Arc::new(ClassifiedsExtractor),
        Source::Catalog => Arc::new(CatalogExtractor),
    }
}
