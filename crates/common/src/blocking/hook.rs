//! Bidder-request hook for the ORTB2 blocking module.
//!
//! Flow for one bidder:
//! 1. Resolve the bidder's ORTB version through the alias table and catalog
//! 2. Read the account configuration
//! 3. Classify the request's media types
//! 4. Resolve blocked attributes for the bidder
//! 5. Record the bidder in the module context and, if anything is blocked,
//!    hand back a payload update
//!
//! Diagnostics are always computed; `debug` only decides whether they are
//! returned to the host.

use std::sync::Arc;

use error_stack::Report;

use crate::catalog::{BidderCatalog, OrtbVersion};
use crate::error::BlockingError;
use crate::hooks::{
    BidderInvocationContext, BidderRequestHook, BidderRequestPayload, InvocationAction,
    InvocationResult, InvocationStatus, PayloadUpdate,
};
use crate::openrtb::BidRequest;

use super::context::ModuleContext;
use super::media_types::classify;
use super::reader::parse_module_config;
use super::resolver::{resolve, BlockedAttributes};

pub const ORTB2_BLOCKING_HOOK_CODE: &str = "ortb2-blocking-bidder-request";

pub struct Ortb2BlockingBidderRequestHook {
    catalog: Arc<dyn BidderCatalog>,
}

impl Ortb2BlockingBidderRequestHook {
    #[must_use]
    pub fn new(catalog: Arc<dyn BidderCatalog>) -> Self {
        Self { catalog }
    }

    /// Look up the bidder's default ORTB version, following request aliases.
    fn ortb_version_of(
        &self,
        context: &BidderInvocationContext<'_>,
    ) -> Result<OrtbVersion, Report<BlockingError>> {
        let canonical = context
            .aliases
            .get(context.bidder)
            .map_or(context.bidder, String::as_str);

        self.catalog
            .bidder_info(canonical)
            .map(|info| info.ortb_version)
            .ok_or_else(|| {
                Report::new(BlockingError::UnknownBidder {
                    bidder: canonical.to_string(),
                })
                .attach(format!("requested as {}", context.bidder))
            })
    }
}

impl BidderRequestHook for Ortb2BlockingBidderRequestHook {
    fn code(&self) -> &'static str {
        ORTB2_BLOCKING_HOOK_CODE
    }

    fn call(
        &self,
        payload: &BidderRequestPayload,
        context: &BidderInvocationContext<'_>,
    ) -> InvocationResult<BidderRequestPayload> {
        let ortb_version = match self.ortb_version_of(context) {
            Ok(version) => version,
            Err(report) => {
                log::error!("ORTB2 blocking disabled for bidder: {:?}", report);
                return InvocationResult::failure(report.current_context().to_string());
            }
        };

        let prior_context = context.module_context.cloned().unwrap_or_default();

        let parsed = match parse_module_config(context.account_config) {
            Ok(parsed) => parsed,
            Err(error) => {
                log::warn!(
                    "Invalid ORTB2 blocking account configuration for bidder {}: {}",
                    context.bidder,
                    error
                );
                return InvocationResult::builder(InvocationStatus::Success)
                    .action(InvocationAction::NoAction)
                    .module_context(prior_context.with_ortb_version(context.bidder, ortb_version))
                    .errors(debug_only(context.debug, vec![error.to_string()]))
                    .build();
            }
        };

        let media_types = classify(&payload.bid_request);
        let resolved = resolve(&parsed.config, context.bidder, &media_types);

        let errors = parsed
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        let module_context =
            prior_context.with_bidder(context.bidder, ortb_version, resolved.blocked.clone());

        let builder = InvocationResult::builder(InvocationStatus::Success)
            .module_context(module_context)
            .warnings(debug_only(context.debug, resolved.warnings))
            .errors(debug_only(context.debug, errors));

        if resolved.blocked.is_empty() {
            return builder.action(InvocationAction::NoAction).build();
        }

        log::debug!(
            "Blocking {:?} for bidder {}",
            resolved.blocked.attributes(),
            context.bidder
        );

        builder
            .action(InvocationAction::Update)
            .payload_update(blocking_update(resolved.blocked))
            .build()
    }
}

fn debug_only(debug: bool, messages: Vec<String>) -> Vec<String> {
    if debug {
        messages
    } else {
        Vec::new()
    }
}

fn blocking_update(blocked: BlockedAttributes) -> PayloadUpdate<BidderRequestPayload> {
    PayloadUpdate::new(move |payload: BidderRequestPayload| {
        BidderRequestPayload::new(apply_blocked_attributes(&blocked, payload.bid_request))
    })
}

/// Overwrite every resolved attribute on `request`; unresolved fields are left
/// as they are.
#[must_use]
pub fn apply_blocked_attributes(
    blocked: &BlockedAttributes,
    mut request: BidRequest,
) -> BidRequest {
    if let Some(badv) = &blocked.badv {
        request.badv = Some(badv.clone());
    }
    if let Some(bapp) = &blocked.bapp {
        request.bapp = Some(bapp.clone());
    }
    if let Some(bcat) = &blocked.bcat {
        request.bcat = Some(bcat.clone());
        if blocked.cattax.is_some() {
            request.cattax = blocked.cattax;
        }
    }

    for imp in &mut request.imp {
        if let (Some(btype), Some(banner)) = (&blocked.btype, imp.banner.as_mut()) {
            banner.btype = Some(btype.clone());
        }
        if let Some(battr) = &blocked.battr {
            if let Some(banner) = imp.banner.as_mut() {
                banner.battr = Some(battr.clone());
            }
            if let Some(video) = imp.video.as_mut() {
                video.battr = Some(battr.clone());
            }
            if let Some(audio) = imp.audio.as_mut() {
                audio.battr = Some(battr.clone());
            }
        }
    }

    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BidderInfo, StaticBidderCatalog};
    use crate::openrtb::{Banner, Imp, Video};
    use crate::test_support::tests::{catalog_with_default, empty_request, video_request};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn hook() -> Ortb2BlockingBidderRequestHook {
        Ortb2BlockingBidderRequestHook::new(Arc::new(catalog_with_default(OrtbVersion::Ortb2_5)))
    }

    fn call(
        hook: &Ortb2BlockingBidderRequestHook,
        account_config: Option<&Value>,
        debug: bool,
    ) -> InvocationResult<BidderRequestPayload> {
        let aliases = HashMap::new();
        let context = BidderInvocationContext::new("bidder1", &aliases)
            .with_account_config(account_config)
            .with_debug(debug);
        hook.call(&video_request(), &context)
    }

    fn ambiguous_badv_config() -> Value {
        json!({
            "attributes": {
                "badv": {
                    "action-overrides": {
                        "blocked": [
                            {"conditions": {"bidders": ["bidder1"]}, "override": ["domain1.com"]},
                            {"conditions": {"bidders": ["bidder1"]}, "override": ["domain2.com"]}
                        ]
                    }
                }
            }
        })
    }

    #[test]
    fn test_no_action_when_no_blocking_attributes() {
        let catalog = StaticBidderCatalog::new()
            .with_bidder("bidder1", BidderInfo::new(OrtbVersion::Ortb2_6))
            .with_bidder("bidder1Base", BidderInfo::new(OrtbVersion::Ortb2_5));
        let hook = Ortb2BlockingBidderRequestHook::new(Arc::new(catalog));
        let aliases = HashMap::from([("bidder1".to_string(), "bidder1Base".to_string())]);
        let context = BidderInvocationContext::new("bidder1", &aliases).with_debug(true);

        let result = hook.call(&video_request(), &context);

        assert_eq!(result.status, InvocationStatus::Success);
        assert_eq!(result.action, InvocationAction::NoAction);
        assert_eq!(
            result.module_context,
            Some(ModuleContext::create().with_ortb_version("bidder1", OrtbVersion::Ortb2_5))
        );
        assert!(result.payload_update.is_none());
        assert!(result.warnings.is_none());
        assert!(result.errors.is_none());
    }

    #[test]
    fn test_no_action_and_error_when_invalid_account_config() {
        let config = json!({"attributes": 1});

        let result = call(&hook(), Some(&config), true);

        assert_eq!(result.status, InvocationStatus::Success);
        assert_eq!(result.action, InvocationAction::NoAction);
        assert_eq!(
            result.module_context,
            Some(ModuleContext::create().with_ortb_version("bidder1", OrtbVersion::Ortb2_5))
        );
        assert_eq!(
            result.errors,
            Some(vec![
                "attributes field in account configuration is not an object".to_string()
            ])
        );
        assert!(result.warnings.is_none());
    }

    #[test]
    fn test_no_action_and_no_error_when_invalid_account_config_and_debug_disabled() {
        let config = json!({"attributes": 1});

        let result = call(&hook(), Some(&config), false);

        assert_eq!(result.status, InvocationStatus::Success);
        assert_eq!(result.action, InvocationAction::NoAction);
        assert_eq!(
            result.module_context,
            Some(ModuleContext::create().with_ortb_version("bidder1", OrtbVersion::Ortb2_5))
        );
        assert!(result.errors.is_none());
        assert!(result.payload_update.is_none());
    }

    #[test]
    fn test_module_context_and_payload_update() {
        let config = json!({
            "attributes": {
                "badv": {"blocked": ["domain1.com"]},
                "bcat": {"blocked": ["cat1"]}
            }
        });

        let result = call(&hook(), Some(&config), true);

        assert_eq!(result.status, InvocationStatus::Success);
        assert_eq!(result.action, InvocationAction::Update);
        let context = result.module_context.as_ref().expect("should have context");
        assert_eq!(
            context.ortb_version_of("bidder1"),
            Some(OrtbVersion::Ortb2_5)
        );
        assert_eq!(
            context.blocked_attributes_for("bidder1"),
            Some(&BlockedAttributes {
                badv: Some(vec!["domain1.com".to_string()]),
                bcat: Some(vec!["cat1".to_string()]),
                ..Default::default()
            })
        );
        assert!(result.warnings.is_none());
        assert!(result.errors.is_none());

        let update = result.payload_update.as_ref().expect("should have update");
        let updated = update.apply(BidderRequestPayload::default());
        assert_eq!(
            updated,
            BidderRequestPayload::new(BidRequest {
                badv: Some(vec!["domain1.com".to_string()]),
                bcat: Some(vec!["cat1".to_string()]),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_update_action_and_warning() {
        let config = ambiguous_badv_config();

        let result = call(&hook(), Some(&config), true);

        assert_eq!(result.status, InvocationStatus::Success);
        assert_eq!(result.action, InvocationAction::Update);
        assert_eq!(
            result
                .module_context
                .as_ref()
                .and_then(|context| context.blocked_attributes_for("bidder1")),
            Some(&BlockedAttributes {
                badv: Some(vec!["domain1.com".to_string()]),
                ..Default::default()
            })
        );
        assert_eq!(
            result.warnings,
            Some(vec![
                "More than one conditions matches request. Bidder: bidder1, request media types: [video]"
                    .to_string()
            ])
        );
        assert!(result.errors.is_none());
    }

    #[test]
    fn test_update_action_and_no_warning_when_debug_disabled() {
        let config = ambiguous_badv_config();

        let result = call(&hook(), Some(&config), false);

        assert_eq!(result.status, InvocationStatus::Success);
        assert_eq!(result.action, InvocationAction::Update);
        assert_eq!(
            result
                .module_context
                .as_ref()
                .and_then(|context| context.blocked_attributes_for("bidder1")),
            Some(&BlockedAttributes {
                badv: Some(vec!["domain1.com".to_string()]),
                ..Default::default()
            })
        );
        assert!(result.warnings.is_none());
        assert!(result.errors.is_none());
    }

    #[test]
    fn test_attribute_errors_reported_only_with_debug() {
        let config = json!({
            "attributes": {
                "badv": {"blocked": "domain1.com"},
                "bcat": ["cat1"]
            }
        });

        let debug = call(&hook(), Some(&config), true);
        assert_eq!(debug.action, InvocationAction::Update);
        assert_eq!(
            debug.errors,
            Some(vec![
                "attributes.badv.blocked field in account configuration is not an array"
                    .to_string()
            ])
        );

        let quiet = call(&hook(), Some(&config), false);
        assert_eq!(quiet.action, InvocationAction::Update);
        assert!(quiet.errors.is_none());
        assert_eq!(quiet.module_context, debug.module_context);
    }

    #[test]
    fn test_unknown_bidder_fails() {
        let hook = Ortb2BlockingBidderRequestHook::new(Arc::new(StaticBidderCatalog::new()));
        let aliases = HashMap::new();
        let context = BidderInvocationContext::new("bidder1", &aliases).with_debug(false);

        let result = hook.call(&empty_request(), &context);

        assert_eq!(result.status, InvocationStatus::Failure);
        assert_eq!(result.action, InvocationAction::NoAction);
        assert!(result.module_context.is_none());
        assert_eq!(
            result.errors,
            Some(vec![
                "Bidder bidder1 is not known to the bidder catalog".to_string()
            ])
        );
    }

    #[test]
    fn test_prior_context_is_extended() {
        let prior = ModuleContext::create().with_ortb_version("bidder0", OrtbVersion::Ortb2_6);
        let config = json!({"attributes": {"bapp": ["com.example"]}});
        let aliases = HashMap::new();
        let context = BidderInvocationContext::new("bidder1", &aliases)
            .with_account_config(Some(&config))
            .with_module_context(Some(&prior));

        let result = hook().call(&video_request(), &context);

        let updated = result.module_context.expect("should have context");
        assert_eq!(prior.len(), 1);
        assert_eq!(updated.len(), 2);
        assert_eq!(
            updated.ortb_version_of("bidder0"),
            Some(OrtbVersion::Ortb2_6)
        );
        assert_eq!(
            updated
                .blocked_attributes_for("bidder1")
                .and_then(|blocked| blocked.bapp.clone()),
            Some(vec!["com.example".to_string()])
        );
    }

    #[test]
    fn test_payload_update_is_idempotent_and_overwrites() {
        let config = json!({
            "attributes": {
                "badv": ["domain1.com"],
                "btype": [1, 2],
                "battr": [3],
                "bcat": {"blocked": ["IAB1"], "category-taxonomy": 6}
            }
        });
        let result = call(&hook(), Some(&config), false);
        let update = result.payload_update.expect("should have update");

        let original = BidderRequestPayload::new(BidRequest {
            badv: Some(vec!["old.com".to_string()]),
            bapp: Some(vec!["com.kept".to_string()]),
            imp: vec![
                Imp {
                    id: Some("1".to_string()),
                    banner: Some(Banner::default()),
                    video: Some(Video::default()),
                    ..Default::default()
                },
                Imp {
                    id: Some("2".to_string()),
                    video: Some(Video::default()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        });

        let once = update.apply(original.clone());
        let twice = update.apply(once.clone());
        assert_eq!(once, twice);

        let request = &once.bid_request;
        assert_eq!(request.badv, Some(vec!["domain1.com".to_string()]));
        assert_eq!(request.bapp, Some(vec!["com.kept".to_string()]));
        assert_eq!(request.bcat, Some(vec!["IAB1".to_string()]));
        assert_eq!(request.cattax, Some(6));

        let banner = request.imp[0].banner.as_ref().expect("should keep banner");
        assert_eq!(banner.btype, Some(vec![1, 2]));
        assert_eq!(banner.battr, Some(vec![3]));
        let video = request.imp[0].video.as_ref().expect("should keep video");
        assert_eq!(video.battr, Some(vec![3]));
        assert!(request.imp[1].banner.is_none());
        let video = request.imp[1].video.as_ref().expect("should keep video");
        assert_eq!(video.battr, Some(vec![3]));

        // the payload the update was built from is untouched
        assert_eq!(original.bid_request.badv, Some(vec!["old.com".to_string()]));
    }

    #[test]
    fn test_no_action_for_empty_attributes_object() {
        let config = json!({"attributes": {}});

        let result = call(&hook(), Some(&config), true);

        assert_eq!(result.action, InvocationAction::NoAction);
        assert!(result.payload_update.is_none());
        assert_eq!(
            result
                .module_context
                .as_ref()
                .and_then(|context| context.ortb_version_of("bidder1")),
            Some(OrtbVersion::Ortb2_5)
        );
    }

    #[test]
    fn test_concurrent_invocations_merge_to_sequential_result() {
        let hook = hook();
        let config = json!({
            "attributes": {
                "badv": {
                    "blocked": ["default.com"],
                    "action-overrides": [
                        {"conditions": {"bidders": ["bidder2"]}, "override": ["two.com"]}
                    ]
                }
            }
        });
        let aliases = HashMap::new();
        let start = ModuleContext::create();
        let bidders = ["bidder1", "bidder2", "bidder3"];
        let payload = video_request();

        let contexts = std::thread::scope(|scope| {
            let handles = bidders
                .iter()
                .map(|bidder| {
                    let (hook, config, aliases, start, payload) =
                        (&hook, &config, &aliases, &start, &payload);
                    scope.spawn(move || {
                        let context = BidderInvocationContext::new(bidder, aliases)
                            .with_account_config(Some(config))
                            .with_module_context(Some(start));
                        hook.call(payload, &context)
                            .module_context
                            .expect("should have context")
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("should join"))
                .collect::<Vec<_>>()
        });

        let merged = contexts.iter().fold(start.clone(), |acc, context| {
            context.bidders().fold(acc, |acc, (bidder, entry)| {
                acc.with_bidder(bidder, entry.ortb_version, entry.blocked_attributes.clone())
            })
        });

        let sequential = bidders.iter().fold(start.clone(), |acc, bidder| {
            let context = BidderInvocationContext::new(bidder, &aliases)
                .with_account_config(Some(&config))
                .with_module_context(Some(&acc));
            hook.call(&payload, &context)
                .module_context
                .expect("should have context")
        });

        assert!(start.is_empty());
        assert_eq!(merged, sequential);
        assert_eq!(
            merged
                .blocked_attributes_for("bidder2")
                .and_then(|blocked| blocked.badv.clone()),
            Some(vec!["two.com".to_string()])
        );
    }

    #[test]
    fn test_hook_code() {
        assert_eq!(hook().code(), "ortb2-blocking-bidder-request");
    }
}
