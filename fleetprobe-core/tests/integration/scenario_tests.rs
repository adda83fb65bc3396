//! Fleet polling scenarios against the in-memory provider

use std::sync::Arc;
use std::time::Duration;

use fleetprobe_core::testing::{HostBehavior, MockProvider, SharedBuffer};
use fleetprobe_core::worker::{ShutdownSignal, WorkerLoop};
use fleetprobe_core::{ConfigError, FleetError, HostList, HostSlot, SessionError};

use super::common::{Harness, context, hosts};

#[test]
fn two_reachable_hosts_one_cycle() {
    let harness = Harness::new();
    let report = harness
        .supervisor(context(Duration::from_millis(10), Some(1)))
        .run(hosts(&["10.0.0.1", "10.0.0.2"]))
        .unwrap();

    let records = harness.records();
    assert_eq!(records.len(), 4);
    assert_eq!(report.records_written, 4);

    for host in ["10.0.0.1", "10.0.0.2"] {
        let labels: Vec<&str> = records
            .iter()
            .filter(|r| r.host == host)
            .map(|r| r.label.as_str())
            .collect();
        assert_eq!(labels, vec!["CPU_LOAD", "MEM_LOAD"], "probes for {host}");
    }

    for record in &records {
        assert_eq!(record.timestamp.len(), 21);
        assert!(record.timestamp.starts_with("[20"));
        let command = if record.label == "CPU_LOAD" {
            fleetprobe_core::config::CPU_LOAD_COMMAND
        } else {
            fleetprobe_core::config::MEM_LOAD_COMMAND
        };
        assert_eq!(record.payload, format!("{command}@{}", record.host));
    }
}

#[test]
fn refused_host_writes_nothing_and_retries() {
    let provider = Arc::new(MockProvider::new());
    provider.set_behavior("10.0.0.1", HostBehavior::refuse_connections());
    let buffer = SharedBuffer::new();
    let sink = Arc::new(fleetprobe_core::OutputSink::new(buffer.clone()));
    let worker = WorkerLoop::new(
        0,
        Arc::clone(&provider),
        Arc::clone(&sink),
        Arc::new(context(Duration::from_millis(1), None)),
        ShutdownSignal::new(),
    );
    let slot = HostSlot::new("10.0.0.1");

    let logs = SharedBuffer::new();
    let log_writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || log_writer.clone())
        .finish();
    let report = tracing::subscriber::with_default(subscriber, || worker.poll_once(&slot));

    let err = report.setup.unwrap_err();
    assert!(matches!(err, SessionError::Connect { .. }));
    assert_eq!(err.address(), "10.0.0.1");
    assert!(buffer.contents().is_empty());

    let log = logs.contents_string();
    assert!(log.contains("10.0.0.1"), "log: {log}");
    assert!(log.contains("Connection refused"), "log: {log}");

    worker.poll_once(&slot);
    assert_eq!(provider.counters("10.0.0.1").connects, 2);
    assert!(buffer.contents().is_empty());
}

#[test]
fn empty_host_list_fails_before_any_worker() {
    assert!(matches!(
        HostList::parse("", 255),
        Err(ConfigError::EmptyHostList)
    ));

    let harness = Harness::new();
    let err = harness
        .supervisor(context(Duration::from_millis(10), Some(1)))
        .run(Vec::new())
        .unwrap_err();

    assert!(matches!(err, FleetError::Config(ConfigError::EmptyHostList)));
    assert!(harness.buffer.contents().is_empty());
    assert!(!harness.sink.is_closed());
}

#[test]
fn every_host_gets_every_probe() {
    let addresses: Vec<String> = (1..=12).map(|n| format!("10.0.1.{n}")).collect();
    let harness = Harness::new();
    harness
        .supervisor(context(Duration::from_millis(1), Some(2)))
        .run(addresses.clone())
        .unwrap();

    let records = harness.records();
    for address in &addresses {
        for label in ["CPU_LOAD", "MEM_LOAD"] {
            let count = records
                .iter()
                .filter(|r| &r.host == address && r.label == label)
                .count();
            assert_eq!(count, 2, "{label} on {address}");
        }
        assert_eq!(harness.provider.counters(address).connects, 1);
    }
    assert_eq!(harness.provider.open_channels(), 0);
}

#[test]
fn multi_line_payload_is_written_raw() {
    let harness = Harness::new();
    harness.provider.set_behavior(
        "10.0.0.1",
        HostBehavior::default().with_output(fleetprobe_core::config::CPU_LOAD_COMMAND, "line one\nline two\n"),
    );
    harness
        .supervisor(context(Duration::from_millis(1), Some(1)))
        .run(hosts(&["10.0.0.1"]))
        .unwrap();

    let output = harness.buffer.contents_string();
    assert!(output.contains(" | 10.0.0.1 | CPU_LOAD | line one\nline two\n["));
}
