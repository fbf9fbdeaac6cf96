//! Host/module contract for bidder-request hooks.
//!
//! A hook is invoked by the host pipeline once per bidder per auction, right
//! before the bidder request is sent. It never mutates the payload it is
//! given; instead it returns an [`InvocationResult`] which may carry a
//! [`PayloadUpdate`] for the host to apply, skip, or compose with other
//! modules' updates.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::blocking::ModuleContext;
use crate::openrtb::BidRequest;

/// Outcome of the invocation itself, independent of what it decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    Success,
    /// The module hit an unexpected fault; the host proceeds as if the module
    /// were disabled for this bidder.
    Failure,
}

/// What the host should do with the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationAction {
    NoAction,
    Update,
}

/// Payload handed to bidder-request hooks: the auction request restricted to
/// one bidder's view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidderRequestPayload {
    pub bid_request: BidRequest,
}

impl BidderRequestPayload {
    #[must_use]
    pub fn new(bid_request: BidRequest) -> Self {
        Self { bid_request }
    }
}

/// A first-class payload transformation.
///
/// Cheap to clone; the same update may be applied to any number of payloads.
pub struct PayloadUpdate<P> {
    apply: Arc<dyn Fn(P) -> P + Send + Sync>,
}

impl<P: 'static> PayloadUpdate<P> {
    pub fn new(apply: impl Fn(P) -> P + Send + Sync + 'static) -> Self {
        Self {
            apply: Arc::new(apply),
        }
    }

    /// Transform `payload` into the updated payload.
    pub fn apply(&self, payload: P) -> P {
        (self.apply)(payload)
    }

    /// Compose two updates: `self` runs first, then `next`.
    #[must_use]
    pub fn and_then(&self, next: &PayloadUpdate<P>) -> Self {
        let first = Arc::clone(&self.apply);
        let second = Arc::clone(&next.apply);
        Self {
            apply: Arc::new(move |payload| second(first(payload))),
        }
    }
}

impl<P> Clone for PayloadUpdate<P> {
    fn clone(&self) -> Self {
        Self {
            apply: Arc::clone(&self.apply),
        }
    }
}

impl<P> fmt::Debug for PayloadUpdate<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadUpdate").finish_non_exhaustive()
    }
}

/// Result of one hook invocation.
#[derive(Debug, Clone)]
pub struct InvocationResult<P> {
    pub status: InvocationStatus,
    pub action: InvocationAction,
    pub module_context: Option<ModuleContext>,
    pub payload_update: Option<PayloadUpdate<P>>,
    pub warnings: Option<Vec<String>>,
    pub errors: Option<Vec<String>>,
}

impl<P> InvocationResult<P> {
    #[must_use]
    pub fn builder(status: InvocationStatus) -> InvocationResultBuilder<P> {
        InvocationResultBuilder {
            status,
            action: InvocationAction::NoAction,
            module_context: None,
            payload_update: None,
            warnings: None,
            errors: None,
        }
    }

    /// Result for a module that could not run; the host keeps the payload
    /// and prior context untouched.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self::builder(InvocationStatus::Failure)
            .errors(vec![error.into()])
            .build()
    }

    /// Apply the payload update if there is one, otherwise hand `payload` back.
    pub fn apply_to(&self, payload: P) -> P
    where
        P: 'static,
    {
        match (&self.action, &self.payload_update) {
            (InvocationAction::Update, Some(update)) => update.apply(payload),
            _ => payload,
        }
    }
}

pub struct InvocationResultBuilder<P> {
    status: InvocationStatus,
    action: InvocationAction,
    module_context: Option<ModuleContext>,
    payload_update: Option<PayloadUpdate<P>>,
    warnings: Option<Vec<String>>,
    errors: Option<Vec<String>>,
}

impl<P> InvocationResultBuilder<P> {
    #[must_use]
    pub fn action(mut self, action: InvocationAction) -> Self {
        self.action = action;
        self
    }

    #[must_use]
    pub fn module_context(mut self, module_context: ModuleContext) -> Self {
        self.module_context = Some(module_context);
        self
    }

    #[must_use]
    pub fn payload_update(mut self, payload_update: PayloadUpdate<P>) -> Self {
        self.payload_update = Some(payload_update);
        self
    }

    /// Attach warnings; an empty list leaves the field unset.
    #[must_use]
    pub fn warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = (!warnings.is_empty()).then_some(warnings);
        self
    }

    /// Attach errors; an empty list leaves the field unset.
    #[must_use]
    pub fn errors(mut self, errors: Vec<String>) -> Self {
        self.errors = (!errors.is_empty()).then_some(errors);
        self
    }

    #[must_use]
    pub fn build(self) -> InvocationResult<P> {
        InvocationResult {
            status: self.status,
            action: self.action,
            module_context: self.module_context,
            payload_update: self.payload_update,
            warnings: self.warnings,
            errors: self.errors,
        }
    }
}

/// Everything the host tells a bidder-request hook about the invocation.
#[derive(Debug, Clone, Copy)]
pub struct BidderInvocationContext<'a> {
    /// Bidder identity being processed (may be an alias).
    pub bidder: &'a str,
    /// Request-scoped alias table (alias -> core bidder name).
    pub aliases: &'a HashMap<String, String>,
    /// This module's account configuration, if the account has one.
    pub account_config: Option<&'a Value>,
    /// Module context produced by the previous invocation in this auction.
    pub module_context: Option<&'a ModuleContext>,
    /// Whether diagnostics may be returned to the caller.
    pub debug: bool,
}

impl<'a> BidderInvocationContext<'a> {
    #[must_use]
    pub fn new(bidder: &'a str, aliases: &'a HashMap<String, String>) -> Self {
        Self {
            bidder,
            aliases,
            account_config: None,
            module_context: None,
            debug: false,
        }
    }

    #[must_use]
    pub fn with_account_config(mut self, account_config: Option<&'a Value>) -> Self {
        self.account_config = account_config;
        self
    }

    #[must_use]
    pub fn with_module_context(mut self, module_context: Option<&'a ModuleContext>) -> Self {
        self.module_context = module_context;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Trait implemented by modules hooked in right before a bidder request is sent.
pub trait BidderRequestHook: Send + Sync {
    /// Stable identifier for this hook, used by the host in logs and config.
    fn code(&self) -> &'static str;

    /// Run the hook for one bidder.
    fn call(
        &self,
        payload: &BidderRequestPayload,
        context: &BidderInvocationContext<'_>,
    ) -> InvocationResult<BidderRequestPayload>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_id(id: &'static str) -> PayloadUpdate<BidderRequestPayload> {
        PayloadUpdate::new(move |mut payload: BidderRequestPayload| {
            payload.bid_request.id = Some(id.to_string());
            payload
        })
    }

    #[test]
    fn test_payload_update_and_then_runs_in_order() {
        let first = set_id("first");
        let second = set_id("second");

        let updated = first
            .and_then(&second)
            .apply(BidderRequestPayload::default());
        assert_eq!(updated.bid_request.id.as_deref(), Some("second"));

        let updated = second
            .and_then(&first)
            .apply(BidderRequestPayload::default());
        assert_eq!(updated.bid_request.id.as_deref(), Some("first"));
    }

    #[test]
    fn test_builder_drops_empty_diagnostics() {
        let result = InvocationResult::<BidderRequestPayload>::builder(InvocationStatus::Success)
            .warnings(Vec::new())
            .errors(Vec::new())
            .build();

        assert_eq!(result.action, InvocationAction::NoAction);
        assert!(result.warnings.is_none());
        assert!(result.errors.is_none());
        assert!(result.module_context.is_none());
    }

    #[test]
    fn test_failure_result() {
        let result = InvocationResult::<BidderRequestPayload>::failure("boom");

        assert_eq!(result.status, InvocationStatus::Failure);
        assert_eq!(result.action, InvocationAction::NoAction);
        assert_eq!(result.errors, Some(vec!["boom".to_string()]));
        assert!(result.payload_update.is_none());
    }

    #[test]
    fn test_apply_to_ignores_update_on_no_action() {
        let result = InvocationResult::builder(InvocationStatus::Success)
            .payload_update(set_id("changed"))
            .build();

        let payload = result.apply_to(BidderRequestPayload::default());
        assert_eq!(payload, BidderRequestPayload::default());
    }
}
