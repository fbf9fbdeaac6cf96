//! Error types for the blocking module and its settings.
//!
//! Configuration shape problems are not errors from the host's point of view:
//! they degrade to "no rule" and are only surfaced as diagnostics. The types
//! here cover the cases that do stop an invocation or a settings load.

use derive_more::{Display, Error};

/// Failures that make the blocking hook unusable for one bidder.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum BlockingError {
    /// The bidder catalog has no entry for the canonical bidder name.
    #[display("Bidder {bidder} is not known to the bidder catalog")]
    UnknownBidder { bidder: String },
}

/// Account configuration does not have the shape the blocking module expects.
///
/// `field` is the dotted path of the offending value, rooted at `attributes`.
/// The rendered messages are returned to API consumers when debug is enabled,
/// so their wording must stay stable.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ConfigShapeError {
    #[display("{field} field in account configuration is not an object")]
    NotAnObject { field: String },

    #[display("{field} field in account configuration is not an array")]
    NotAnArray { field: String },

    #[display("{field} field in account configuration is missing")]
    Missing { field: String },

    #[display("{field} field in account configuration has unexpected type. Expected {expected}")]
    UnexpectedType {
        field: String,
        expected: &'static str,
    },

    #[display("{field} field in account configuration contains unknown media type: {value}")]
    UnknownMediaType { field: String, value: String },
}

/// Errors raised while loading service settings.
#[derive(Debug, Display, Error)]
pub enum SettingsError {
    /// The TOML source or environment overrides could not be read.
    #[display("Configuration error: {message}")]
    Configuration { message: String },

    /// The settings were read but failed validation.
    #[display("Settings validation failed: {message}")]
    Validation { message: String },
}
