//! Core types and shared functionality for offerscout.
//!
//! This crate provides:
//! - Locale-tolerant price parsing
//! - Query normalization and offer records
//! - Per-source TTL result cache with an injectable clock
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod offer;
pub mod price;
pub mod query;
pub mod source;

pub use cache::{CacheEntry, Clock, ManualClock, ResultCache, SystemClock};
pub use config::{AppConfig, ConfigError, SourceConfig, Transport};
pub use error::Error;
pub use offer::{Currency, NormalizedOffer, OfferProjection, RawOffer, Rejection, ValidationDecision};
pub use price::parse_price;
pub use query::Query;
pub use source::Source;
