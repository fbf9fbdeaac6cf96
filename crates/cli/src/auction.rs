//! Minimal host pipeline for the blocking hook.
//!
//! Runs the bidder-request hook once per bidder, threading the module context
//! from one invocation to the next the way an auction server would, and
//! collects the request each bidder would actually receive.

use std::collections::BTreeMap;
use std::sync::Arc;

use ortb2_blocking_common::blocking::{ModuleContext, Ortb2BlockingBidderRequestHook};
use ortb2_blocking_common::catalog::{BidderCatalog, StaticBidderCatalog};
use ortb2_blocking_common::hooks::{
    BidderInvocationContext, BidderRequestHook, BidderRequestPayload, InvocationAction,
    InvocationStatus,
};
use ortb2_blocking_common::openrtb::BidRequest;
use serde::Serialize;
use serde_json::Value;

/// What the hook did for one bidder.
#[derive(Debug, Serialize)]
pub(crate) struct BidderOutcome {
    pub status: InvocationStatus,
    pub action: InvocationAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    /// Request as it would be sent to the bidder.
    pub request: BidRequest,
}

#[derive(Debug, Serialize)]
pub(crate) struct AuctionOutcome {
    pub module_context: ModuleContext,
    pub bidders: BTreeMap<String, BidderOutcome>,
    /// Bidders the catalog marks as disabled; they are never invoked.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

pub(crate) struct AuctionRunner {
    catalog: Arc<StaticBidderCatalog>,
    hook: Ortb2BlockingBidderRequestHook,
}

impl AuctionRunner {
    pub(crate) fn new(catalog: StaticBidderCatalog) -> Self {
        let catalog = Arc::new(catalog);
        let hook = Ortb2BlockingBidderRequestHook::new(catalog.clone());
        log::info!("Registered bidder request hook: {}", hook.code());
        Self { catalog, hook }
    }

    /// Run the hook for every bidder in order.
    ///
    /// A failed invocation leaves that bidder's request untouched and the
    /// context as it was before the call.
    pub(crate) fn run(
        &self,
        request: &BidRequest,
        account_config: Option<&Value>,
        bidders: &[String],
        debug: bool,
    ) -> AuctionOutcome {
        let aliases = request.aliases();
        let payload = BidderRequestPayload::new(request.clone());
        let mut module_context = ModuleContext::create();
        let mut outcomes = BTreeMap::new();
        let mut skipped = Vec::new();

        for bidder in bidders {
            let canonical = aliases.get(bidder).unwrap_or(bidder);
            if self
                .catalog
                .bidder_info(canonical)
                .is_some_and(|info| !info.enabled)
            {
                log::info!("Skipping disabled bidder {}", bidder);
                skipped.push(bidder.clone());
                continue;
            }

            let context = BidderInvocationContext::new(bidder, &aliases)
                .with_account_config(account_config)
                .with_module_context(Some(&module_context))
                .with_debug(debug);
            let result = self.hook.call(&payload, &context);

            let updated = result.apply_to(payload.clone());
            if result.status == InvocationStatus::Success {
                if let Some(next) = &result.module_context {
                    module_context = next.clone();
                }
            } else {
                log::warn!(
                    "Hook {} failed for bidder {}, continuing without it",
                    self.hook.code(),
                    bidder
                );
            }

            log::debug!("Bidder {} action: {:?}", bidder, result.action);

            outcomes.insert(
                bidder.clone(),
                BidderOutcome {
                    status: result.status,
                    action: result.action,
                    warnings: result.warnings,
                    errors: result.errors,
                    request: updated.bid_request,
                },
            );
        }

        AuctionOutcome {
            module_context,
            bidders: outcomes,
            skipped,
        }
    }
}
