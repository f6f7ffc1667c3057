//! Marketplace sources served by the pipeline.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// One marketplace the pipeline can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Auction-style marketplace, read from its "sold items" feed.
    Auction,
    /// Peer-to-peer classifieds marketplace.
    Classifieds,
    /// Card-pricing catalog with per-seller listings.
    Catalog,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Auction, Source::Classifieds, Source::Catalog];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Auction => "auction",
            Source::Classifieds => "classifieds",
            Source::Catalog => "catalog",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auction" => Ok(Source::Auction),
            "classifieds" => Ok(Source::Classifieds),
            "catalog" => Ok(Source::Catalog),
            other => Err(Error::UnknownSource(other.to_string())),
        }
    }
}
