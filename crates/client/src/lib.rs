//! Browser-driven marketplace access for offerscout.
//!
//! This crate provides the extractors, the scoped browser session driver, the
//! per-source adapters, the external validator client and the client-side
//! search coordinator shared by the server surfaces.

pub mod adapter;
pub mod coordinator;
pub mod extract;
pub mod session;
pub mod validator;

pub use adapter::{EmptyPolicy, MarketplaceAdapter, SourceAdapter, SourceProfile, build_adapters, default_launcher};
pub use coordinator::{
    DirectSource, HttpOfferSource, OfferSource, PriceSummary, SearchCoordinator, SearchOutcome, SearchResult,
    SlotState,
};
pub use extract::{OfferExtractor, extractor_for};
pub use session::{BrowserSession, ReadyState, SessionDriver, SessionError, SessionLauncher, UnavailableLauncher};
pub use validator::{HttpValidator, OfferValidator};
