//! Bidder catalog collaborator.
//!
//! The blocking hook only needs one fact from the catalog: which OpenRTB
//! revision a bidder adapter expects by default. The catalog is consulted by
//! canonical bidder name, after request-scoped aliases have been resolved.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::settings::CatalogSettings;

/// OpenRTB protocol revision expected by a bidder adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrtbVersion {
    #[default]
    #[serde(rename = "2.5")]
    Ortb2_5,
    #[serde(rename = "2.6")]
    Ortb2_6,
}

impl fmt::Display for OrtbVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrtbVersion::Ortb2_5 => write!(f, "2.5"),
            OrtbVersion::Ortb2_6 => write!(f, "2.6"),
        }
    }
}

/// Catalog entry for a single bidder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidderInfo {
    pub enabled: bool,
    pub ortb_version: OrtbVersion,
}

impl BidderInfo {
    #[must_use]
    pub fn new(ortb_version: OrtbVersion) -> Self {
        Self {
            enabled: true,
            ortb_version,
        }
    }
}

/// Lookup of bidder adapter metadata by canonical bidder name.
pub trait BidderCatalog: Send + Sync {
    /// Return the catalog entry for `bidder`, or `None` if it is unknown.
    fn bidder_info(&self, bidder: &str) -> Option<BidderInfo>;
}

/// Catalog backed by an in-memory table, usually built from settings.
#[derive(Debug, Clone, Default)]
pub struct StaticBidderCatalog {
    bidders: BTreeMap<String, BidderInfo>,
}

impl StaticBidderCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a bidder entry.
    #[must_use]
    pub fn with_bidder(mut self, bidder: impl Into<String>, info: BidderInfo) -> Self {
        self.bidders.insert(bidder.into(), info);
        self
    }

    /// Build a catalog from the `[catalog]` settings section.
    ///
    /// Bidders without an explicit `ortb_version` inherit the catalog default.
    #[must_use]
    pub fn from_settings(settings: &CatalogSettings) -> Self {
        let bidders = settings
            .bidders
            .iter()
            .map(|(name, bidder)| {
                let info = BidderInfo {
                    enabled: bidder.enabled,
                    ortb_version: bidder.ortb_version.unwrap_or(settings.default_ortb_version),
                };
                (name.clone(), info)
            })
            .collect::<BTreeMap<_, _>>();

        log::info!("Bidder catalog built with {} bidders", bidders.len());

        Self { bidders }
    }

    /// Number of bidders in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bidders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bidders.is_empty()
    }
}

impl BidderCatalog for StaticBidderCatalog {
    fn bidder_info(&self, bidder: &str) -> Option<BidderInfo> {
        self.bidders.get(bidder).copied()
    }
}
