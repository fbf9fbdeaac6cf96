//! Service settings for hosts running the blocking hook.
//!
//! Settings are read from TOML and merged with environment variables prefixed
//! with `ORTB2_BLOCKING__`. For example,
//! `ORTB2_BLOCKING__CATALOG__DEFAULT_ORTB_VERSION=2.6` overrides
//! `catalog.default_ortb_version`.

use std::collections::BTreeMap;
use std::str::FromStr;

use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::catalog::OrtbVersion;
use crate::error::SettingsError;

pub const ENVIRONMENT_VARIABLE_PREFIX: &str = "ORTB2_BLOCKING";
pub const ENVIRONMENT_VARIABLE_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LoggingSettings {
    /// Maximum log level (`error`, `warn`, `info`, `debug`, `trace`, `off`).
    #[serde(default = "default_log_level")]
    #[validate(custom(function = "validate_log_level"))]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingSettings {
    /// Parsed level filter; falls back to `Info` for unparseable values.
    #[must_use]
    pub fn level_filter(&self) -> log::LevelFilter {
        log::LevelFilter::from_str(&self.level).unwrap_or(log::LevelFilter::Info)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    log::LevelFilter::from_str(level)
        .map(|_| ())
        .map_err(|_| ValidationError::new("unknown_log_level"))
}

/// Per-bidder catalog entry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BidderSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Overrides the catalog-wide default revision.
    #[serde(default)]
    pub ortb_version: Option<OrtbVersion>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct CatalogSettings {
    #[serde(default)]
    pub default_ortb_version: OrtbVersion,
    #[serde(default)]
    #[validate(custom(function = "validate_bidder_names"))]
    pub bidders: BTreeMap<String, BidderSettings>,
}

fn validate_bidder_names(
    bidders: &BTreeMap<String, BidderSettings>,
) -> Result<(), ValidationError> {
    if bidders.keys().any(|name| name.trim().is_empty()) {
        return Err(ValidationError::new("empty_bidder_name"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct Settings {
    #[serde(default)]
    #[validate(nested)]
    pub logging: LoggingSettings,
    #[serde(default)]
    #[validate(nested)]
    pub catalog: CatalogSettings,
}

impl Settings {
    /// Parse settings from a TOML string and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Configuration`] when the TOML is malformed or
    /// cannot be deserialized, and [`SettingsError::Validation`] when the
    /// merged settings fail validation.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<SettingsError>> {
        let environment = Environment::default()
            .prefix(ENVIRONMENT_VARIABLE_PREFIX)
            .separator(ENVIRONMENT_VARIABLE_SEPARATOR);

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let config = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .change_context(SettingsError::Configuration {
                message: "Failed to build configuration".to_string(),
            })?;

        let settings: Self = config
            .try_deserialize()
            .change_context(SettingsError::Configuration {
                message: "Failed to deserialize settings".to_string(),
            })?;

        if let Err(e) = settings.validate() {
            return Err(Report::new(SettingsError::Validation {
                message: e.to_string(),
            }));
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_valid_toml() {
        let toml_str = r#"
            [logging]
            level = "debug"

            [catalog]
            default_ortb_version = "2.6"

            [catalog.bidders.appnexus]
            ortb_version = "2.5"

            [catalog.bidders.rubicon]
            enabled = false
            "#;

        let settings = Settings::from_toml(toml_str).expect("should parse settings");

        assert_eq!(settings.logging.level_filter(), log::LevelFilter::Debug);
        assert_eq!(settings.catalog.default_ortb_version, OrtbVersion::Ortb2_6);
        assert_eq!(
            settings.catalog.bidders["appnexus"].ortb_version,
            Some(OrtbVersion::Ortb2_5)
        );
        assert!(!settings.catalog.bidders["rubicon"].enabled);
        assert_eq!(settings.catalog.bidders["rubicon"].ortb_version, None);
    }

    #[test]
    fn test_settings_empty_toml_uses_defaults() {
        let settings = Settings::from_toml("").expect("should parse empty settings");

        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.catalog.default_ortb_version, OrtbVersion::Ortb2_5);
        assert!(settings.catalog.bidders.is_empty());
    }

    #[test]
    fn test_settings_invalid_toml_syntax() {
        let toml_str = r#"
            [catalog
            default_ortb_version = "2.6"
            "#;

        let settings = Settings::from_toml(toml_str);
        assert!(settings.is_err(), "Should fail with invalid TOML syntax");
    }

    #[test]
    fn test_settings_unknown_ortb_version() {
        let toml_str = r#"
            [catalog]
            default_ortb_version = "3.0"
            "#;

        let err = Settings::from_toml(toml_str).expect_err("should reject unknown version");
        assert!(matches!(
            err.current_context(),
            SettingsError::Configuration { .. }
        ));
    }

    #[test]
    fn test_settings_invalid_log_level() {
        let toml_str = r#"
            [logging]
            level = "loud"
            "#;

        let err = Settings::from_toml(toml_str).expect_err("should reject log level");
        assert!(matches!(
            err.current_context(),
            SettingsError::Validation { .. }
        ));
    }

    #[test]
    fn test_override_env() {
        let toml_str = r#"
            [catalog]
            default_ortb_version = "2.5"
            "#;

        temp_env::with_var(
            "ORTB2_BLOCKING__CATALOG__DEFAULT_ORTB_VERSION",
            Some("2.6"),
            || {
                let settings = Settings::from_toml(toml_str).expect("should parse settings");
                assert_eq!(settings.catalog.default_ortb_version, OrtbVersion::Ortb2_6);
            },
        );
    }
}
