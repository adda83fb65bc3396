//! Probe definitions
//!
//! A probe is an opaque `(label, command)` pair. The command string is sent
//! to the remote shell as-is; nothing here parses or interprets its output.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::sink::RECORD_DELIMITER;

/// Label of the reference CPU load probe
pub const CPU_LOAD_LABEL: &str = "CPU_LOAD";

/// Label of the reference memory load probe
pub const MEM_LOAD_LABEL: &str = "MEM_LOAD";

/// Reference CPU load command: busy fraction from a single `top` sample
pub const CPU_LOAD_COMMAND: &str = r#"top -bn1 | grep "Cpu(s)" | sed "s/.*, *\([0-9.]*\)%* id.*/\1/" | awk '{print (100 - $1)/100}'"#;

/// Reference memory load command: `MemFree / MemTotal` from `/proc/meminfo`
pub const MEM_LOAD_COMMAND: &str =
    r#"head -n2 /proc/meminfo | awk '{v[NR]=$2} END {printf "%.3f\n", v[2]/v[1]}'"#;

/// One diagnostic command and the label its records carry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Probe {
    /// Record label, e.g. `CPU_LOAD`
    pub label: String,
    /// Command line executed on the remote host
    pub command: String,
}

impl Probe {
    /// Creates a probe
    #[must_use]
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
        }
    }

    fn check(&self, index: usize) -> ConfigResult<()> {
        let invalid = |reason: &str| ConfigError::InvalidProbe {
            index,
            reason: reason.to_string(),
        };

        if self.label.trim().is_empty() {
            return Err(invalid("label is empty"));
        }
        if self.label.contains(RECORD_DELIMITER) {
            return Err(invalid("label contains the record delimiter ' | '"));
        }
        if self.label.contains(['\n', '\r']) {
            return Err(invalid("label contains a line break"));
        }
        if self.command.trim().is_empty() {
            return Err(invalid("command is empty"));
        }
        Ok(())
    }
}

/// Ordered, validated list of probes run against every host each cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSet {
    probes: Vec<Probe>,
}

impl ProbeSet {
    /// Validates and wraps `probes`, keeping their order
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty, a probe has an empty or
    /// malformed label, an empty command, or two probes share a label.
    pub fn new(probes: Vec<Probe>) -> ConfigResult<Self> {
        if probes.is_empty() {
            return Err(ConfigError::NoProbes);
        }

        let mut seen = HashSet::with_capacity(probes.len());
        for (index, probe) in probes.iter().enumerate() {
            probe.check(index)?;
            if !seen.insert(probe.label.as_str()) {
                return Err(ConfigError::DuplicateLabel(probe.label.clone()));
            }
        }

        Ok(Self { probes })
    }

    /// The reference pair: `CPU_LOAD` then `MEM_LOAD`
    #[must_use]
    pub fn reference() -> Self {
        Self {
            probes: default_probes(),
        }
    }

    /// Probes in execution order
    pub fn iter(&self) -> std::slice::Iter<'_, Probe> {
        self.probes.iter()
    }

    /// Number of probes
    #[must_use]
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    /// Always `false` for a constructed set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Labels in execution order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.probes.iter().map(|p| p.label.as_str())
    }
}

impl<'a> IntoIterator for &'a ProbeSet {
    type Item = &'a Probe;
    type IntoIter = std::slice::Iter<'a, Probe>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Default probe list used when the config file names none
#[must_use]
pub fn default_probes() -> Vec<Probe> {
    vec![
        Probe::new(CPU_LOAD_LABEL, CPU_LOAD_COMMAND),
        Probe::new(MEM_LOAD_LABEL, MEM_LOAD_COMMAND),
    ]
}
