//! Host list loading
//!
//! The host file holds one address per line. Blank lines and lines starting
//! with `#` are skipped; any whitespace separates addresses, so a line with
//! two addresses yields two hosts.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// Default host capacity
pub const DEFAULT_MAX_HOSTS: usize = 255;

/// Validated, ordered, duplicate-free list of host addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostList {
    hosts: Vec<String>,
}

impl HostList {
    /// Validates an explicit list of addresses
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty, longer than `max_hosts`, or
    /// contains the same address twice.
    pub fn new(hosts: Vec<String>, max_hosts: usize) -> ConfigResult<Self> {
        if hosts.is_empty() {
            return Err(ConfigError::EmptyHostList);
        }
        if hosts.len() > max_hosts {
            return Err(ConfigError::TooManyHosts {
                count: hosts.len(),
                max: max_hosts,
            });
        }

        let mut seen = HashSet::with_capacity(hosts.len());
        for host in &hosts {
            if !seen.insert(host.as_str()) {
                return Err(ConfigError::DuplicateHost(host.clone()));
            }
        }

        Ok(Self { hosts })
    }

    /// Parses host file contents
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    pub fn parse(content: &str, max_hosts: usize) -> ConfigResult<Self> {
        let hosts = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .flat_map(str::split_whitespace)
            .map(String::from)
            .collect();
        Self::new(hosts, max_hosts)
    }

    /// Reads and parses a host file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read, otherwise the
    /// same errors as [`Self::parse`].
    pub fn load(path: &Path, max_hosts: usize) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let list = Self::parse(&content, max_hosts)?;
        tracing::debug!(path = %path.display(), hosts = list.len(), "Loaded host list");
        Ok(list)
    }

    /// Addresses in file order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }

    /// Number of hosts
    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Always `false` for a constructed list
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Consumes the list, returning the addresses
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.hosts
    }
}
