//! CLI error types.

use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum CliError {
    /// Settings file error
    #[display("Configuration error: {_0}")]
    Config(#[error(not(source))] String),
    /// IO error
    #[display("IO error: {_0}")]
    Io(std::io::Error),
    /// JSON parsing error
    #[display("JSON error: {_0}")]
    Json(serde_json::Error),
    /// Logger setup error
    #[display("Logging error: {_0}")]
    Logging(log::SetLoggerError),
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Json(err)
    }
}

impl From<log::SetLoggerError> for CliError {
    fn from(err: log::SetLoggerError) -> Self {
        CliError::Logging(err)
    }
}
