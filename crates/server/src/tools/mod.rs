//! MCP tool implementations.
//!
//! This module contains all tools exposed by the offerscout server.

pub mod cache_clear;
pub mod market_search;

pub use cache_clear::{CacheClearParams, clear_impl};
pub use market_search::{MarketSearchParams, search_impl};
