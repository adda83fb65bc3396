//! Shared fixtures for the polling integration tests

use std::sync::Arc;
use std::time::Duration;

use fleetprobe_core::sink::RECORD_DELIMITER;
use fleetprobe_core::testing::{MockProvider, SharedBuffer};
use fleetprobe_core::{Credentials, OutputSink, PollContext, ProbeSet, Supervisor};

/// One parsed output line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub timestamp: String,
    pub host: String,
    pub label: String,
    pub payload: String,
}

pub struct Harness {
    pub provider: Arc<MockProvider>,
    pub buffer: SharedBuffer,
    pub sink: Arc<OutputSink>,
}

impl Harness {
    pub fn new() -> Self {
        let buffer = SharedBuffer::new();
        Self {
            provider: Arc::new(MockProvider::new()),
            sink: Arc::new(OutputSink::new(buffer.clone())),
            buffer,
        }
    }

    pub fn supervisor(&self, context: PollContext) -> Supervisor<MockProvider> {
        Supervisor::new(Arc::clone(&self.provider), Arc::clone(&self.sink), context)
    }

    /// Records in output order; every default mock payload is one line
    pub fn records(&self) -> Vec<ParsedRecord> {
        self.buffer
            .contents_string()
            .lines()
            .map(|line| parse_line(line).unwrap_or_else(|| panic!("malformed record: {line:?}")))
            .collect()
    }
}

pub fn parse_line(line: &str) -> Option<ParsedRecord> {
    let mut fields = line.splitn(4, RECORD_DELIMITER);
    Some(ParsedRecord {
        timestamp: fields.next()?.to_string(),
        host: fields.next()?.to_string(),
        label: fields.next()?.to_string(),
        payload: fields.next()?.to_string(),
    })
}

pub fn credentials() -> Credentials {
    Credentials::from_plain("monitor", "secret").unwrap()
}

pub fn context(interval: Duration, max_cycles: Option<u64>) -> PollContext {
    let mut context = PollContext::new(credentials(), ProbeSet::reference(), interval);
    context.max_cycles = max_cycles;
    context
}

pub fn hosts(addresses: &[&str]) -> Vec<String> {
    addresses.iter().map(ToString::to_string).collect()
}
