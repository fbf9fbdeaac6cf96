//! Rule model for the blocking module.
//!
//! A [`ModuleConfig`] is built fresh for every invocation from the account
//! configuration and is never mutated afterwards.

use std::collections::BTreeSet;
use std::fmt;

use super::media_types::MediaType;

/// Closed set of request attributes the module can block.
///
/// The declaration order is the canonical processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attribute {
    /// Blocked advertiser domains.
    Badv,
    /// Blocked app bundles.
    Bapp,
    /// Blocked creative attributes.
    Battr,
    /// Blocked advertiser categories.
    Bcat,
    /// Blocked banner ad types.
    Btype,
}

impl Attribute {
    pub const ALL: [Attribute; 5] = [
        Attribute::Badv,
        Attribute::Bapp,
        Attribute::Battr,
        Attribute::Bcat,
        Attribute::Btype,
    ];

    /// Key used both in account configuration and in the OpenRTB request.
    #[must_use]
    pub fn field_name(self) -> &'static str {
        match self {
            Attribute::Badv => "badv",
            Attribute::Bapp => "bapp",
            Attribute::Battr => "battr",
            Attribute::Bcat => "bcat",
            Attribute::Btype => "btype",
        }
    }

    #[must_use]
    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|attribute| attribute.field_name() == name)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// When an override applies. `None` matches anything; an empty set matches
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    pub bidders: Option<BTreeSet<String>>,
    pub media_types: Option<BTreeSet<MediaType>>,
}

impl Conditions {
    #[must_use]
    pub fn new(
        bidders: Option<BTreeSet<String>>,
        media_types: Option<BTreeSet<MediaType>>,
    ) -> Self {
        Self {
            bidders,
            media_types,
        }
    }

    /// True when the bidder is allowed and at least one request media type
    /// is listed.
    #[must_use]
    pub fn matches(&self, bidder: &str, request_media_types: &BTreeSet<MediaType>) -> bool {
        let bidder_matches = self
            .bidders
            .as_ref()
            .is_none_or(|bidders| bidders.contains(bidder));
        let media_type_matches = self
            .media_types
            .as_ref()
            .is_none_or(|media_types| !media_types.is_disjoint(request_media_types));

        bidder_matches && media_type_matches
    }
}

/// Values to block when `conditions` match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override<T> {
    pub conditions: Conditions,
    pub values: Vec<T>,
}

impl<T> Override<T> {
    #[must_use]
    pub fn new(conditions: Conditions, values: Vec<T>) -> Self {
        Self { conditions, values }
    }
}

/// Blocking policy for one attribute. The first matching override wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRule<T> {
    pub default_blocked: Option<Vec<T>>,
    pub overrides: Vec<Override<T>>,
}

impl<T> Default for AttributeRule<T> {
    fn default() -> Self {
        Self {
            default_blocked: None,
            overrides: Vec::new(),
        }
    }
}

impl<T> AttributeRule<T> {
    #[must_use]
    pub fn blocked(values: Vec<T>) -> Self {
        Self {
            default_blocked: Some(values),
            overrides: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_override(mut self, conditions: Conditions, values: Vec<T>) -> Self {
        self.overrides.push(Override::new(conditions, values));
        self
    }
}

/// One optional rule per blockable attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    pub badv: Option<AttributeRule<String>>,
    pub bapp: Option<AttributeRule<String>>,
    pub battr: Option<AttributeRule<i32>>,
    pub bcat: Option<AttributeRule<String>>,
    pub btype: Option<AttributeRule<i32>>,
    /// Category taxonomy sent alongside a resolved `bcat`.
    pub cattax: Option<i32>,
}

impl Attributes {
    /// Whether any attribute has a rule.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.badv.is_none()
            && self.bapp.is_none()
            && self.battr.is_none()
            && self.bcat.is_none()
            && self.btype.is_none()
    }

    #[must_use]
    pub fn has_rule(&self, attribute: Attribute) -> bool {
        match attribute {
            Attribute::Badv => self.badv.is_some(),
            Attribute::Bapp => self.bapp.is_some(),
            Attribute::Battr => self.battr.is_some(),
            Attribute::Bcat => self.bcat.is_some(),
            Attribute::Btype => self.btype.is_some(),
        }
    }

    /// Attributes that have a rule, in canonical order.
    #[must_use]
    pub fn configured(&self) -> Vec<Attribute> {
        Attribute::ALL
            .into_iter()
            .filter(|attribute| self.has_rule(*attribute))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleConfig {
    pub attributes: Attributes,
}

impl ModuleConfig {
    #[must_use]
    pub fn new(attributes: Attributes) -> Self {
        Self { attributes }
    }
}
