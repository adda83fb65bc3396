//! Cooperative shutdown

use std::thread;
use std::time::{Duration, Instant};

use fleetprobe_core::testing::HostBehavior;
use fleetprobe_core::{ProbeSet, Probe, SinkError, RecordHeader};

use super::common::{Harness, context, hosts, parse_line};

fn wait_for_records(harness: &Harness, count: u64) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while harness.sink.records_written() < count {
        assert!(Instant::now() < deadline, "poller produced no output");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn interrupt_mid_run_tears_down_cleanly() {
    let harness = Harness::new();
    let supervisor = harness.supervisor(context(Duration::from_millis(20), None));
    let shutdown = supervisor.shutdown_signal();

    let report = thread::scope(|scope| {
        let run = scope.spawn(|| supervisor.run(hosts(&["10.0.0.1", "10.0.0.2", "10.0.0.3"])));
        wait_for_records(&harness, 6);
        shutdown.trigger();
        run.join().unwrap()
    })
    .unwrap();

    assert!(report.interrupted);
    assert_eq!(report.sessions_closed, 3);
    assert!(harness.sink.is_closed());
    assert_eq!(harness.provider.open_channels(), 0);
    for host in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
        assert_eq!(harness.provider.counters(host).sessions_closed, 1);
    }

    let written = harness.buffer.contents();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(harness.buffer.contents(), written);
    let late = harness
        .sink
        .write_record(&RecordHeader::now("10.0.0.1", "CPU_LOAD"), b"late\n");
    assert!(matches!(late, Err(SinkError::Closed)));
}

#[test]
fn shutdown_waits_for_in_flight_record() {
    let harness = Harness::new();
    harness.provider.set_behavior(
        "10.0.0.1",
        HostBehavior::default()
            .with_output("slow", vec![b'z'; 2000])
            .with_read_delay(Duration::from_millis(2)),
    );
    let mut poll = context(Duration::from_millis(1), None);
    poll.probes = ProbeSet::new(vec![Probe::new("SLOW", "slow")]).unwrap();
    let supervisor = harness.supervisor(poll);
    let shutdown = supervisor.shutdown_signal();

    let report = thread::scope(|scope| {
        let run = scope.spawn(|| supervisor.run(hosts(&["10.0.0.1"])));
        wait_for_records(&harness, 1);
        shutdown.trigger();
        run.join().unwrap()
    })
    .unwrap();

    assert!(report.interrupted);
    // Every record that was started is complete: header plus 2000 bytes.
    let output = harness.buffer.contents_string();
    let records: Vec<_> = output.split('[').filter(|s| !s.is_empty()).collect();
    assert_eq!(records.len() as u64, report.records_written);
    for record in records {
        let parsed = parse_line(&format!("[{record}")).unwrap();
        assert_eq!(parsed.payload.len(), 2000);
    }
    assert_eq!(harness.provider.open_channels(), 0);
}

#[test]
fn sleeping_workers_wake_on_shutdown() {
    let harness = Harness::new();
    let supervisor = harness.supervisor(context(Duration::from_secs(3600), None));
    let shutdown = supervisor.shutdown_signal();

    let started = Instant::now();
    let report = thread::scope(|scope| {
        let run = scope.spawn(|| supervisor.run(hosts(&["10.0.0.1", "10.0.0.2"])));
        wait_for_records(&harness, 4);
        shutdown.trigger();
        run.join().unwrap()
    })
    .unwrap();

    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(report.cycles(), 2);
    assert_eq!(report.records_written, 4);
}
