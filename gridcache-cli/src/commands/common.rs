//! Common utilities shared across CLI commands.

use std::path::Path;

use gridcache::config::ConfigFile;
use gridcache::logging::{init_file_logging, LoggingGuard};

use crate::error::CliError;

/// Load the configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Send logs to the configured file, keeping stdout for command output.
pub fn init_logging(config: &ConfigFile) -> Result<LoggingGuard, CliError> {
    init_file_logging(&config.logging.directory, &config.logging.file)
        .map_err(|e| CliError::LoggingInit(e.to_string()))
}

/// Multi-threaded runtime for the async commands.
pub fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new().map_err(CliError::Runtime)
}
