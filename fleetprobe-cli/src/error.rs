//! CLI error types and exit codes.

use fleetprobe_core::error::{ConfigError, FleetError};

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, validation, or other non-connection errors
    pub const GENERAL_ERROR: i32 = 1;
    /// Connection failure - one or more hosts failed `check --connect`
    pub const CONNECTION_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The poller could not start or did not stop cleanly
    #[error("{0}")]
    Poller(FleetError),

    /// Connectivity check failed
    #[error("Connection check failed: {0}")]
    CheckFailed(String),

    /// Interrupt handler could not be installed
    #[error("Failed to install interrupt handler: {0}")]
    Signal(String),

    /// Logging could not be initialized
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FleetError> for CliError {
    fn from(err: FleetError) -> Self {
        match err {
            FleetError::Config(e) => Self::Config(e),
            other => Self::Poller(other),
        }
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success, including shutdown on interrupt (not an error)
    /// - 1: General error (configuration, validation, IO, poller failure)
    /// - 2: Connection failure during `check --connect`
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::CheckFailed(_) => exit_codes::CONNECTION_FAILURE,
            Self::Config(_)
            | Self::Poller(_)
            | Self::Signal(_)
            | Self::Logging(_)
            | Self::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }
}
