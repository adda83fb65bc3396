//! `fleetprobe` Core Library
//!
//! A persistent fleet poller: one long-lived authenticated SSH session per
//! host, a fixed set of diagnostic commands run over it every cycle, and
//! timestamped results written to a shared sink.
//!
//! # Crate Structure
//!
//! - [`queue`] - Rotating job queue with a lock-protected cursor
//! - [`provider`] - Remote session capability and the libssh2 implementation
//! - [`session`] - Per-host session lifecycle
//! - [`executor`] - One probe on one host, with guaranteed channel release
//! - [`sink`] - Serialized record output
//! - [`worker`] - Per-thread polling loop and shutdown signal
//! - [`supervisor`] - Spawning, supervising and tearing down workers
//! - [`config`] - Settings, probes and the host list
//! - [`testing`] - In-memory provider for tests

#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod provider;
pub mod queue;
pub mod session;
pub mod sink;
pub mod supervisor;
pub mod testing;
pub mod tracing;
pub mod worker;

pub use config::{HostList, PollerSettings, Probe, ProbeSet, Scheduling};
pub use credentials::Credentials;
pub use error::{
    ConfigError, ConfigResult, ExecError, FleetError, FleetResult, ProviderError, QueueError,
    RunError, SessionError, SinkError,
};
pub use executor::{CommandExecutor, ExecutorOptions, ProbeOutput};
pub use provider::{RemoteSessionProvider, Ssh2Provider, SshOptions};
pub use queue::JobQueue;
pub use session::{HostSession, HostSlot, SessionState};
pub use sink::{OutputSink, RecordHeader};
pub use supervisor::{RunReport, Supervisor};
pub use worker::{CycleReport, PollContext, ShutdownSignal, StopReason, WorkerLoop};
