//! Error types for `fleetprobe`
//!
//! One enum per concern. Per-host errors always carry the host address so
//! a log line is attributable without extra context.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Configuration errors. Fatal at startup, raised before any worker runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The host list contained no addresses
    #[error("Host list is empty")]
    EmptyHostList,

    /// The host list exceeds the configured capacity
    #[error("Host list has {count} entries, maximum is {max}")]
    TooManyHosts {
        /// Number of hosts found
        count: usize,
        /// Configured maximum
        max: usize,
    },

    /// The same address appears twice in the host list
    #[error("Duplicate host address: {0}")]
    DuplicateHost(String),

    /// No probes are configured
    #[error("Probe set is empty")]
    NoProbes,

    /// A probe failed validation
    #[error("Invalid probe #{index}: {reason}")]
    InvalidProbe {
        /// Zero-based position in the probe list
        index: usize,
        /// What is wrong with it
        reason: String,
    },

    /// Two probes share a label
    #[error("Duplicate probe label: {0}")]
    DuplicateLabel(String),

    /// A numeric setting is out of range
    #[error("Invalid setting '{field}': {reason}")]
    InvalidSetting {
        /// Setting name as it appears in the config file
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// No username was supplied
    #[error("Username is required")]
    MissingUsername,

    /// Reading a config or host file failed
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The config file is not valid TOML for `PollerSettings`
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Error reported by a [`crate::provider::RemoteSessionProvider`] operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}{}", code_suffix(.code))]
pub struct ProviderError {
    /// Provider-specific numeric code, if the backend reports one
    pub code: Option<i32>,
    /// Human-readable description
    pub message: String,
}

impl ProviderError {
    /// Creates an error without a numeric code
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Creates an error with a numeric code
    #[must_use]
    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

#[allow(clippy::ref_option)]
fn code_suffix(code: &Option<i32>) -> String {
    code.map_or_else(String::new, |code| format!(" (code {code})"))
}

impl From<io::Error> for ProviderError {
    fn from(err: io::Error) -> Self {
        Self {
            code: err.raw_os_error(),
            message: err.to_string(),
        }
    }
}

/// Session setup failures. Per-host and non-fatal: the host reverts to
/// `Disconnected` and setup is retried on the next cycle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// TCP connection could not be established
    #[error("{address} - connection failed: {source}")]
    Connect {
        /// Host address
        address: String,
        /// Provider error
        #[source]
        source: ProviderError,
    },

    /// Protocol handshake failed
    #[error("{address} - handshake failed: {source}")]
    Handshake {
        /// Host address
        address: String,
        /// Provider error
        #[source]
        source: ProviderError,
    },

    /// Username/password authentication was rejected
    #[error("{address} - authentication failed: {source}")]
    Authenticate {
        /// Host address
        address: String,
        /// Provider error
        #[source]
        source: ProviderError,
    },
}

impl SessionError {
    /// Returns the address of the host that failed
    #[must_use]
    pub fn address(&self) -> &str {
        match self {
            Self::Connect { address, .. }
            | Self::Handshake { address, .. }
            | Self::Authenticate { address, .. } => address,
        }
    }
}

/// Result of starting a command on an open channel
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecError {
    /// The backend could not allocate memory for the request
    #[error("internal allocation failure")]
    Alloc,

    /// The request could not be sent on the socket
    #[error("failed to send data on socket")]
    SocketSend,

    /// The remote side refused the exec request
    #[error("channel request denied")]
    RequestDenied,

    /// The request would block on a non-blocking session
    #[error("operation would block")]
    WouldBlock,

    /// Any other result code
    #[error("unknown exec result: {message} (code {code})")]
    Unknown {
        /// Raw result code
        code: i32,
        /// Backend description
        message: String,
    },
}

/// Failure of a single probe execution. Per-command and non-fatal.
#[derive(Debug, Error)]
pub enum RunError {
    /// The host has no ready session
    #[error("{address} - session does not exist")]
    NoSession {
        /// Host address
        address: String,
    },

    /// Opening a command channel failed
    #[error("{address} - failed to open channel: {source}")]
    OpenChannel {
        /// Host address
        address: String,
        /// Provider error
        #[source]
        source: ProviderError,
    },

    /// The exec request was not accepted
    #[error("{address} - failed to execute command: {source}")]
    Exec {
        /// Host address
        address: String,
        /// Classified exec failure
        #[source]
        source: ExecError,
    },

    /// Reading command output failed
    #[error("{address} - failed to read from channel: {source}")]
    Read {
        /// Host address
        address: String,
        /// Provider error
        #[source]
        source: ProviderError,
    },

    /// Writing the record failed
    #[error("{address} - failed to write record: {source}")]
    Sink {
        /// Host address
        address: String,
        /// Sink error
        #[source]
        source: SinkError,
    },
}

impl RunError {
    /// Whether this failure means the session itself can no longer be trusted.
    ///
    /// A session fault forces a fresh Connect/Handshake/Authenticate on the
    /// next cycle instead of reusing the handle.
    #[must_use]
    pub const fn is_session_fault(&self) -> bool {
        match self {
            Self::NoSession { .. } | Self::OpenChannel { .. } | Self::Read { .. } => true,
            Self::Exec { source, .. } => matches!(source, ExecError::SocketSend),
            Self::Sink { .. } => false,
        }
    }

    /// Whether the output sink has been closed for shutdown
    #[must_use]
    pub const fn is_sink_closed(&self) -> bool {
        matches!(
            self,
            Self::Sink {
                source: SinkError::Closed,
                ..
            }
        )
    }
}

/// Output sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing to the destination failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The sink was closed; no new records are accepted
    #[error("output sink is closed")]
    Closed,
}

/// Job queue errors
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum QueueError {
    /// A queue needs at least one entry
    #[error("Job queue cannot be empty")]
    Empty,
}

/// Top-level error for the poller
#[derive(Debug, Error)]
pub enum FleetError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Job queue error
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Output sink error
    #[error("Output error: {0}")]
    Sink(#[from] SinkError),

    /// A worker thread could not be spawned
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    /// A worker thread panicked
    #[error("Worker thread for {0} panicked")]
    WorkerPanicked(String),
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for poller operations
pub type FleetResult<T> = std::result::Result<T, FleetError>;
