//! Common functionality for the ORTB2 blocking hook.
//!
//! This crate provides the blocking module itself together with the pieces of
//! the host contract it depends on.
//!
//! # Modules
//!
//! - [`blocking`]: Attribute blocking rules, resolution and the bidder-request hook
//! - [`catalog`]: Bidder catalog lookups and ORTB versions
//! - [`error`]: Error types and error handling utilities
//! - [`hooks`]: Host/module contract for bidder-request hooks
//! - [`openrtb`]: Minimal OpenRTB bid request model
//! - [`settings`]: Configuration management and validation
//! - [`test_support`]: Testing utilities and mocks

pub mod blocking;
pub mod catalog;
pub mod error;
pub mod hooks;
pub mod openrtb;
pub mod settings;
