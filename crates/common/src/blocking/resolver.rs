//! Resolution of blocking rules for one bidder and one request.
//!
//! For each configured attribute the first matching override wins. Further
//! matches do not change the outcome but produce one ambiguity warning for the
//! attribute. With no match the attribute's default list applies, and with no
//! default the attribute is left out entirely.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::config::{Attribute, AttributeRule, ModuleConfig};
use super::media_types::{format_media_types, MediaType};

/// Blocked values chosen for one bidder.
///
/// `None` means the attribute is not blocked at all, which is different from
/// blocking an explicitly empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badv: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bapp: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battr: Option<Vec<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcat: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub btype: Option<Vec<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cattax: Option<i32>,
}

impl BlockedAttributes {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.badv.is_none()
            && self.bapp.is_none()
            && self.battr.is_none()
            && self.bcat.is_none()
            && self.btype.is_none()
    }

    /// Attributes that resolved to a block list, in canonical order.
    #[must_use]
    pub fn attributes(&self) -> Vec<Attribute> {
        Attribute::ALL
            .into_iter()
            .filter(|attribute| match attribute {
                Attribute::Badv => self.badv.is_some(),
                Attribute::Bapp => self.bapp.is_some(),
                Attribute::Battr => self.battr.is_some(),
                Attribute::Bcat => self.bcat.is_some(),
                Attribute::Btype => self.btype.is_some(),
            })
            .collect()
    }
}

/// Output of [`resolve`]: the blocked attributes plus ambiguity warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAttributes {
    pub blocked: BlockedAttributes,
    pub warnings: Vec<String>,
}

struct AttributeResolution<T> {
    values: Option<Vec<T>>,
    ambiguous: bool,
}

/// Resolve every configured attribute for `bidder`.
#[must_use]
pub fn resolve(
    config: &ModuleConfig,
    bidder: &str,
    request_media_types: &BTreeSet<MediaType>,
) -> ResolvedAttributes {
    let attributes = &config.attributes;
    let mut blocked = BlockedAttributes::default();
    let mut warnings = Vec::new();

    for attribute in Attribute::ALL {
        let was_ambiguous = match attribute {
            Attribute::Badv => resolve_into(
                attributes.badv.as_ref(),
                &mut blocked.badv,
                bidder,
                request_media_types,
            ),
            Attribute::Bapp => resolve_into(
                attributes.bapp.as_ref(),
                &mut blocked.bapp,
                bidder,
                request_media_types,
            ),
            Attribute::Battr => resolve_into(
                attributes.battr.as_ref(),
                &mut blocked.battr,
                bidder,
                request_media_types,
            ),
            Attribute::Bcat => resolve_into(
                attributes.bcat.as_ref(),
                &mut blocked.bcat,
                bidder,
                request_media_types,
            ),
            Attribute::Btype => resolve_into(
                attributes.btype.as_ref(),
                &mut blocked.btype,
                bidder,
                request_media_types,
            ),
        };

        if was_ambiguous {
            log::debug!("Ambiguous {} overrides for bidder {}", attribute, bidder);
            warnings.push(ambiguity_warning(bidder, request_media_types));
        }
    }

    if blocked.bcat.is_some() {
        blocked.cattax = attributes.cattax;
    }

    ResolvedAttributes { blocked, warnings }
}

fn resolve_into<T: Clone>(
    rule: Option<&AttributeRule<T>>,
    slot: &mut Option<Vec<T>>,
    bidder: &str,
    request_media_types: &BTreeSet<MediaType>,
) -> bool {
    let Some(rule) = rule else {
        return false;
    };

    let resolution = resolve_attribute(rule, bidder, request_media_types);
    *slot = resolution.values;
    resolution.ambiguous
}

fn resolve_attribute<T: Clone>(
    rule: &AttributeRule<T>,
    bidder: &str,
    request_media_types: &BTreeSet<MediaType>,
) -> AttributeResolution<T> {
    let mut matching = rule
        .overrides
        .iter()
        .filter(|candidate| candidate.conditions.matches(bidder, request_media_types));

    match matching.next() {
        Some(winner) => AttributeResolution {
            values: Some(winner.values.clone()),
            ambiguous: matching.next().is_some(),
        },
        None => AttributeResolution {
            values: rule.default_blocked.clone(),
            ambiguous: false,
        },
    }
}

fn ambiguity_warning(bidder: &str, request_media_types: &BTreeSet<MediaType>) -> String {
    format!(
        "More than one conditions matches request. Bidder: {}, request media types: {}",
        bidder,
        format_media_types(request_media_types)
    )
}
