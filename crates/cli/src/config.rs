//! Settings and input loading.
//!
//! Settings are loaded from a TOML file and merged with environment variables
//! prefixed with `ORTB2_BLOCKING__`. For example,
//! `ORTB2_BLOCKING__LOGGING__LEVEL=debug` overrides `logging.level`.

use std::fs;
use std::path::Path;

use ortb2_blocking_common::openrtb::BidRequest;
use ortb2_blocking_common::settings::Settings;
use serde_json::Value;

use crate::error::CliError;

/// Load settings from `file`, or defaults plus environment overrides when no
/// file is given.
pub(crate) fn load_settings(file: Option<&Path>) -> Result<Settings, CliError> {
    let content = match file {
        Some(path) => fs::read_to_string(path)?,
        None => String::new(),
    };

    Settings::from_toml(&content)
        .map_err(|e| CliError::Config(format!("Failed to load settings: {e:?}")))
}

/// Read the module's account configuration from a JSON file.
pub(crate) fn load_account_config(path: &Path) -> Result<Value, CliError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Read an OpenRTB bid request from a JSON file.
pub(crate) fn load_bid_request(path: &Path) -> Result<BidRequest, CliError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
