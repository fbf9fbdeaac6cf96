//! Per-auction module context.
//!
//! The host creates an empty context at auction start and threads it through
//! every invocation of the hook. Each invocation returns a new context with
//! exactly one more bidder entry; the value it was given is left untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::OrtbVersion;

use super::resolver::BlockedAttributes;

/// What the hook recorded for one bidder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidderContext {
    pub ortb_version: OrtbVersion,
    #[serde(default, skip_serializing_if = "BlockedAttributes::is_empty")]
    pub blocked_attributes: BlockedAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleContext {
    bidders: BTreeMap<String, BidderContext>,
}

impl ModuleContext {
    #[must_use]
    pub fn create() -> Self {
        Self::default()
    }

    /// Return a copy of this context with an entry for `bidder`.
    #[must_use]
    pub fn with_bidder(
        &self,
        bidder: impl Into<String>,
        ortb_version: OrtbVersion,
        blocked_attributes: BlockedAttributes,
    ) -> Self {
        let mut bidders = self.bidders.clone();
        bidders.insert(
            bidder.into(),
            BidderContext {
                ortb_version,
                blocked_attributes,
            },
        );
        Self { bidders }
    }

    /// Shorthand for an entry that blocks nothing.
    #[must_use]
    pub fn with_ortb_version(&self, bidder: impl Into<String>, ortb_version: OrtbVersion) -> Self {
        self.with_bidder(bidder, ortb_version, BlockedAttributes::default())
    }

    #[must_use]
    pub fn ortb_version_of(&self, bidder: &str) -> Option<OrtbVersion> {
        self.bidders.get(bidder).map(|entry| entry.ortb_version)
    }

    #[must_use]
    pub fn blocked_attributes_for(&self, bidder: &str) -> Option<&BlockedAttributes> {
        self.bidders
            .get(bidder)
            .map(|entry| &entry.blocked_attributes)
    }

    /// Bidder entries in name order.
    pub fn bidders(&self) -> impl Iterator<Item = (&str, &BidderContext)> {
        self.bidders
            .iter()
            .map(|(bidder, entry)| (bidder.as_str(), entry))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bidders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bidders.is_empty()
    }
}
