//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;
use gridcache::config::ConfigFileError;
use gridcache::grid::GridSetError;
use gridcache::quota::QuotaError;
use gridcache::storage::StorageError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be loaded
    Config(ConfigFileError),
    /// Command line arguments are inconsistent
    InvalidArgument(String),
    /// Grid set could not be built
    Grid(GridSetError),
    /// Tile addressing or format lookup failed
    Storage(StorageError),
    /// Quota service failure
    Quota(QuotaError),
    /// Async runtime could not be created
    Runtime(std::io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Check the configuration file, or pass another one with --config.");
            }
            CliError::Quota(QuotaError::Persistence(_)) => {
                eprintln!();
                eprintln!("The quota record file may be damaged. Delete it to rescan the cache.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "{}", msg),
            CliError::Grid(e) => write!(f, "Invalid grid set: {}", e),
            CliError::Storage(e) => write!(f, "{}", e),
            CliError::Quota(e) => write!(f, "Disk quota error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Grid(e) => Some(e),
            CliError::Storage(e) => Some(e),
            CliError::Quota(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<GridSetError> for CliError {
    fn from(e: GridSetError) -> Self {
        CliError::Grid(e)
    }
}

impl From<StorageError> for CliError {
    fn from(e: StorageError) -> Self {
        CliError::Storage(e)
    }
}

impl From<QuotaError> for CliError {
    fn from(e: QuotaError) -> Self {
        CliError::Quota(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = CliError::InvalidArgument("--levels must be at least 1".to_string());
        assert_eq!(err.to_string(), "--levels must be at least 1");

        let err: CliError = QuotaError::UnknownLayer("roads".to_string()).into();
        assert!(err.to_string().starts_with("Disk quota error:"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
