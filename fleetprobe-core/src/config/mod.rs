//! Configuration for `fleetprobe`
//!
//! Settings come from a TOML file, the host list from a plain text file,
//! and the probe set from the settings. Everything is validated before a
//! single worker starts.

pub mod hosts;
pub mod probes;
pub mod settings;

pub use hosts::{DEFAULT_MAX_HOSTS, HostList};
pub use probes::{
    CPU_LOAD_COMMAND, CPU_LOAD_LABEL, MEM_LOAD_COMMAND, MEM_LOAD_LABEL, Probe, ProbeSet,
    default_probes,
};
pub use settings::{PollerSettings, Scheduling};
