//! Poller settings (`fleetprobe.toml`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::hosts::{DEFAULT_MAX_HOSTS, HostList};
use super::probes::{Probe, ProbeSet, default_probes};
use crate::error::{ConfigError, ConfigResult};
use crate::provider::SshOptions;
use crate::provider::ssh::DEFAULT_SSH_PORT;

/// How workers are matched to hosts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheduling {
    /// One worker per host, bound for the whole run
    #[default]
    Dedicated,
    /// A fixed pool of workers rotating over the shared job queue
    Shared,
}

impl std::fmt::Display for Scheduling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dedicated => write!(f, "dedicated"),
            Self::Shared => write!(f, "shared"),
        }
    }
}

/// Everything the poller needs apart from credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollerSettings {
    /// Host list file, relative to the working directory (default: `ip.txt`)
    #[serde(default = "default_hosts_file")]
    pub hosts_file: PathBuf,
    /// Seconds a worker sleeps between probe rounds (default: 5)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// SSH port on every host (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,
    /// TCP connect deadline in seconds, `0` disables it (default: 10)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Deadline for blocking SSH calls in seconds, `0` disables it (default: 0)
    #[serde(default)]
    pub session_timeout_secs: u64,
    /// Maximum accepted host count (default: 255)
    #[serde(default = "default_max_hosts")]
    pub max_hosts: usize,
    /// Worker scheduling mode
    #[serde(default)]
    pub scheduling: Scheduling,
    /// Pool size for `shared` scheduling; defaults to the host count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Stop each worker after this many cycles; runs until shutdown when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cycles: Option<u64>,
    /// Append records to this file instead of stdout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Probes run against every host, in order
    #[serde(default = "default_probes")]
    pub probes: Vec<Probe>,
}

fn default_hosts_file() -> PathBuf {
    PathBuf::from("ip.txt")
}

const fn default_interval_secs() -> u64 {
    5
}

const fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

const fn default_max_hosts() -> usize {
    DEFAULT_MAX_HOSTS
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            hosts_file: default_hosts_file(),
            interval_secs: default_interval_secs(),
            port: default_port(),
            connect_timeout_secs: default_connect_timeout_secs(),
            session_timeout_secs: 0,
            max_hosts: default_max_hosts(),
            scheduling: Scheduling::default(),
            workers: None,
            max_cycles: None,
            output: None,
            probes: default_probes(),
        }
    }
}

impl PollerSettings {
    /// Parses settings from TOML text. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML or unknown fields.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reads settings from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read, or
    /// `ConfigError::Parse` if it is not valid.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Checks ranges and the probe list
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.interval_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "interval_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_hosts == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "max_hosts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.scheduling == Scheduling::Shared && self.workers == Some(0) {
            return Err(ConfigError::InvalidSetting {
                field: "workers",
                reason: "shared scheduling needs at least one worker".to_string(),
            });
        }
        if self.max_cycles == Some(0) {
            return Err(ConfigError::InvalidSetting {
                field: "max_cycles",
                reason: "must be at least 1 when set".to_string(),
            });
        }
        self.probe_set().map(|_| ())
    }

    /// Validated probe set
    ///
    /// # Errors
    ///
    /// Returns an error if the probe list is invalid.
    pub fn probe_set(&self) -> ConfigResult<ProbeSet> {
        ProbeSet::new(self.probes.clone())
    }

    /// Loads the host list named by `hosts_file`
    ///
    /// # Errors
    ///
    /// See [`HostList::load`].
    pub fn load_hosts(&self) -> ConfigResult<HostList> {
        HostList::load(&self.hosts_file, self.max_hosts)
    }

    /// Sleep between probe rounds
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Number of worker threads for `host_count` hosts
    #[must_use]
    pub fn worker_count(&self, host_count: usize) -> usize {
        match self.scheduling {
            Scheduling::Dedicated => host_count,
            Scheduling::Shared => self.workers.unwrap_or(host_count),
        }
    }

    /// Transport options for [`crate::provider::Ssh2Provider`]
    #[must_use]
    pub const fn ssh_options(&self) -> SshOptions {
        SshOptions {
            port: self.port,
            connect_timeout: non_zero_secs(self.connect_timeout_secs),
            session_timeout: non_zero_secs(self.session_timeout_secs),
        }
    }
}

const fn non_zero_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}
