//! ORTB2 attribute blocking module.
//!
//! Decides, per bidder and per auction, which request attributes (advertiser
//! domains, categories, app bundles, banner types, creative attributes) are
//! blocked before the request reaches that bidder. Rules come from the
//! account configuration; see [`reader`] for the accepted shape.

pub mod config;
pub mod context;
pub mod hook;
pub mod media_types;
pub mod reader;
pub mod resolver;

pub use config::{Attribute, AttributeRule, Attributes, Conditions, ModuleConfig, Override};
pub use context::{BidderContext, ModuleContext};
pub use hook::{
    apply_blocked_attributes, Ortb2BlockingBidderRequestHook, ORTB2_BLOCKING_HOOK_CODE,
};
pub use media_types::{classify, MediaType};
pub use reader::{parse_module_config, ParsedModuleConfig};
pub use resolver::{resolve, BlockedAttributes, ResolvedAttributes};
