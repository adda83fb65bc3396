//! Failures on one host never affect another

use std::time::Duration;

use fleetprobe_core::testing::HostBehavior;
use fleetprobe_core::{ExecError, Scheduling};

use super::common::{Harness, context, hosts};

#[test]
fn unreachable_host_does_not_block_others() {
    let harness = Harness::new();
    harness
        .provider
        .set_behavior("10.0.0.1", HostBehavior::refuse_connections());
    harness
        .provider
        .set_behavior("10.0.0.2", HostBehavior::reject_password());

    let report = harness
        .supervisor(context(Duration::from_millis(1), Some(3)))
        .run(hosts(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]))
        .unwrap();

    let records = harness.records();
    assert!(records.iter().all(|r| r.host == "10.0.0.3"));
    assert_eq!(records.len(), 6);
    assert_eq!(harness.provider.counters("10.0.0.1").connects, 3);
    assert_eq!(harness.provider.counters("10.0.0.2").authentications, 3);
    assert_eq!(harness.provider.counters("10.0.0.3").connects, 1);
    let setup_failures: u64 = report.workers.iter().map(|w| w.setup_failures).sum();
    assert_eq!(setup_failures, 6);
}

#[test]
fn failing_commands_keep_polling() {
    let harness = Harness::new();
    harness.provider.set_behavior(
        "10.0.0.1",
        HostBehavior::failing_exec(ExecError::RequestDenied),
    );

    let report = harness
        .supervisor(context(Duration::from_millis(1), Some(4)))
        .run(hosts(&["10.0.0.1", "10.0.0.2"]))
        .unwrap();

    assert!(report.workers.iter().all(|w| w.cycles == 4));
    assert_eq!(harness.provider.counters("10.0.0.1").execs, 8);
    assert_eq!(harness.provider.counters("10.0.0.1").connects, 1);
    assert_eq!(harness.provider.open_channels(), 0);
    assert_eq!(harness.records().len(), 8);
}

#[test]
fn dead_session_is_rebuilt_next_cycle() {
    let harness = Harness::new();
    harness
        .provider
        .set_behavior("10.0.0.1", HostBehavior::dead_session());

    harness
        .supervisor(context(Duration::from_millis(1), Some(3)))
        .run(hosts(&["10.0.0.1"]))
        .unwrap();

    // Each cycle sets up a session, loses it on the first channel open and
    // discards it.
    let counters = harness.provider.counters("10.0.0.1");
    assert_eq!(counters.connects, 3);
    assert_eq!(counters.sessions_closed, 3);
}

#[test]
fn shared_workers_never_double_up_on_a_host() {
    let harness = Harness::new();
    for host in ["a", "b"] {
        harness.provider.set_behavior(
            host,
            HostBehavior::default().with_read_delay(Duration::from_millis(1)),
        );
    }

    let report = harness
        .supervisor(context(Duration::from_millis(1), Some(5)))
        .with_scheduling(Scheduling::Shared, Some(6))
        .run(hosts(&["a", "b"]))
        .unwrap();

    assert_eq!(report.workers.len(), 6);
    assert_eq!(report.cycles(), 30);
    // A per-host lock means one session per host despite six workers.
    assert_eq!(harness.provider.counters("a").connects, 1);
    assert_eq!(harness.provider.counters("b").connects, 1);
    assert_eq!(harness.records().len(), 60);
}
