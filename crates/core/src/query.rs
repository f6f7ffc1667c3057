//! User search queries and their normalized form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A user-supplied search string together with its normalized form.
///
/// The normalized form (lower-cased, trimmed, internal whitespace collapsed
/// to single spaces) is both the cache key and the deduplication key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    raw: String,
    normalized: String,
}

impl Query {
    /// Build a query, rejecting strings that normalize to nothing.
    pub fn new(raw: impl Into<String>) -> Result<Self, Error> {
        let raw = raw.into();
        let normalized = normalize(&raw);
        if normalized.is_empty() {
            return Err(Error::InvalidInput("query cannot be empty".into()));
        }
        Ok(Self { raw, normalized })
    }

    /// The string exactly as the user typed it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Normalized form used for cache lookups and in-flight deduplication.
    pub fn key(&self) -> &str {
        &self.normalized
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

/// Lower-case, trim and collapse internal whitespace.
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  Evolving   Skies\tBooster  Box "), "evolving skies booster box");
    }

    #[test]
    fn test_query_keeps_raw() {
        let q = Query::new(" Charizard  ETB").unwrap();
        assert_eq!(q.raw(), " Charizard  ETB");
        assert_eq!(q.key(), "charizard etb");
        assert_eq!(q.to_string(), "charizard etb");
    }

    #[test]
    fn test_equivalent_queries_share_key() {
        let a = Query::new("151 Booster Bundle").unwrap();
        let b = Query::new("151   booster bundle ").unwrap();
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_blank_query_rejected() {
        assert!(matches!(Query::new("   "), Err(Error::InvalidInput(_))));
        assert!(matches!(Query::new(""), Err(Error::InvalidInput(_))));
    }
}
