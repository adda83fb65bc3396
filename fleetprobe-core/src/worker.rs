//! Per-thread polling driver
//!
//! A worker repeatedly takes a host, makes sure its session is ready, runs
//! every probe in order and sleeps for the poll interval. Failures are
//! logged and never end the loop; only the shutdown signal, a closed sink
//! or the cycle limit do.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::ProbeSet;
use crate::credentials::Credentials;
use crate::error::{RunError, SessionError};
use crate::executor::{CommandExecutor, ExecutorOptions, ProbeOutput};
use crate::provider::RemoteSessionProvider;
use crate::queue::JobQueue;
use crate::session::HostSlot;
use crate::sink::OutputSink;

/// Cooperative stop flag shared by the supervisor and every worker.
///
/// Workers check it between probe rounds and sleep on it between cycles, so
/// a trigger wakes sleeping workers immediately.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownSignal {
    /// Creates an untriggered signal
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self) -> MutexGuard<'_, bool> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Requests shutdown and wakes every waiter
    pub fn trigger(&self) {
        *self.flag() = true;
        self.inner.1.notify_all();
    }

    /// Whether shutdown was requested
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.flag()
    }

    /// Sleeps up to `timeout`. Returns `true` if shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut triggered = self.flag();
        while !*triggered {
            let remaining = match deadline {
                Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                    Some(left) if !left.is_zero() => left,
                    _ => break,
                },
                None => timeout,
            };
            triggered = self
                .inner
                .1
                .wait_timeout(triggered, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *triggered
    }
}

/// Read-only state shared by every worker
#[derive(Debug)]
pub struct PollContext {
    /// Login used for every session
    pub credentials: Credentials,
    /// Probes run each cycle
    pub probes: ProbeSet,
    /// Sleep between cycles
    pub interval: Duration,
    /// Stop after this many cycles per worker
    pub max_cycles: Option<u64>,
    /// Executor tuning
    pub executor: ExecutorOptions,
}

impl PollContext {
    /// Creates a context that polls forever with default executor options
    #[must_use]
    pub fn new(credentials: Credentials, probes: ProbeSet, interval: Duration) -> Self {
        Self {
            credentials,
            probes,
            interval,
            max_cycles: None,
            executor: ExecutorOptions::default(),
        }
    }

    /// Limits every worker to `cycles` cycles
    #[must_use]
    pub const fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }
}

/// Outcome of one probe within a cycle
#[derive(Debug)]
pub struct ProbeOutcome {
    /// Probe label
    pub label: String,
    /// What happened
    pub result: Result<ProbeOutput, RunError>,
}

/// What happened to one host in one cycle
#[derive(Debug)]
pub struct CycleReport {
    /// Host address
    pub host: String,
    /// Session setup result; probes are skipped when this is an error
    pub setup: Result<(), SessionError>,
    /// Per-probe outcomes in execution order
    pub probes: Vec<ProbeOutcome>,
    /// Whether the session was discarded after a session fault
    pub session_invalidated: bool,
}

impl CycleReport {
    /// Number of probes that wrote a complete record
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.probes.iter().filter(|p| p.result.is_ok()).count()
    }

    /// Whether a probe hit the closed sink
    #[must_use]
    pub fn sink_closed(&self) -> bool {
        self.probes
            .iter()
            .any(|p| p.result.as_ref().is_err_and(RunError::is_sink_closed))
    }
}

/// Where a worker gets its next host
pub enum HostSource<P: RemoteSessionProvider> {
    /// Always the same host
    Bound(Arc<HostSlot<P>>),
    /// Next entry of the shared rotation
    Queue(Arc<JobQueue<Arc<HostSlot<P>>>>),
}

impl<P: RemoteSessionProvider> HostSource<P> {
    fn next(&self) -> &Arc<HostSlot<P>> {
        match self {
            Self::Bound(slot) => slot,
            Self::Queue(queue) => queue.next(),
        }
    }
}

impl<P: RemoteSessionProvider> std::fmt::Debug for HostSource<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bound(slot) => f.debug_tuple("Bound").field(&slot.address()).finish(),
            Self::Queue(queue) => f.debug_tuple("Queue").field(&queue.len()).finish(),
        }
    }
}

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown signal was triggered
    Shutdown,
    /// The output sink was closed
    SinkClosed,
    /// `max_cycles` was reached
    CycleLimit,
}

/// Totals for one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSummary {
    /// Worker index
    pub worker: usize,
    /// Cycles started
    pub cycles: u64,
    /// Probes that wrote a complete record
    pub probes_ok: u64,
    /// Probes that failed
    pub probes_failed: u64,
    /// Failed session setups
    pub setup_failures: u64,
    /// Why the loop ended
    pub stop_reason: StopReason,
}

/// The per-thread driver
pub struct WorkerLoop<P: RemoteSessionProvider> {
    id: usize,
    provider: Arc<P>,
    sink: Arc<OutputSink>,
    context: Arc<PollContext>,
    shutdown: ShutdownSignal,
}

impl<P: RemoteSessionProvider> WorkerLoop<P> {
    /// Creates a worker
    #[must_use]
    pub const fn new(
        id: usize,
        provider: Arc<P>,
        sink: Arc<OutputSink>,
        context: Arc<PollContext>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            id,
            provider,
            sink,
            context,
            shutdown,
        }
    }

    /// Runs one cycle against `slot`.
    ///
    /// The slot stays locked for the whole cycle. A session fault during any
    /// probe discards the session so the next cycle sets up a new one; the
    /// remaining probes of this cycle are still attempted.
    pub fn poll_once(&self, slot: &HostSlot<P>) -> CycleReport {
        let mut host = slot.lock();
        let _span = tracing::debug_span!(
            crate::tracing::span_names::WORKER_CYCLE,
            worker = self.id,
            host = %host.address()
        )
        .entered();

        let mut report = CycleReport {
            host: host.address().to_string(),
            setup: Ok(()),
            probes: Vec::with_capacity(self.context.probes.len()),
            session_invalidated: false,
        };

        if let Err(err) = host.ensure_ready(self.provider.as_ref(), &self.context.credentials) {
            tracing::warn!(host = %err.address(), error = %err, "Session setup failed");
            report.setup = Err(err);
            return report;
        }

        let executor =
            CommandExecutor::with_options(self.provider.as_ref(), &self.sink, self.context.executor);
        let mut session_fault = false;

        for probe in &self.context.probes {
            if self.shutdown.is_triggered() {
                break;
            }
            // A faulted session gives every remaining probe the same error.
            let result = if session_fault {
                Err(RunError::NoSession {
                    address: report.host.clone(),
                })
            } else {
                executor.run(&host, probe)
            };

            if let Err(err) = &result {
                if err.is_sink_closed() {
                    tracing::debug!(host = %report.host, label = %probe.label, "Sink closed, skipping");
                } else {
                    tracing::warn!(host = %report.host, label = %probe.label, error = %err, "Probe failed");
                }
                session_fault |= err.is_session_fault();
            }

            let stop = result.as_ref().is_err_and(RunError::is_sink_closed);
            report.probes.push(ProbeOutcome {
                label: probe.label.clone(),
                result,
            });
            if stop {
                break;
            }
        }

        if session_fault {
            host.invalidate(self.provider.as_ref());
            report.session_invalidated = true;
        }
        report
    }

    /// Polls until shutdown, sink close or the cycle limit
    pub fn run(&self, source: &HostSource<P>) -> WorkerSummary {
        let mut summary = WorkerSummary {
            worker: self.id,
            cycles: 0,
            probes_ok: 0,
            probes_failed: 0,
            setup_failures: 0,
            stop_reason: StopReason::Shutdown,
        };
        tracing::debug!(worker = self.id, source = ?source, "Worker started");

        loop {
            if self.shutdown.is_triggered() {
                summary.stop_reason = StopReason::Shutdown;
                break;
            }
            if self.sink.is_closed() {
                summary.stop_reason = StopReason::SinkClosed;
                break;
            }

            let report = self.poll_once(source.next());
            summary.cycles += 1;
            if report.setup.is_err() {
                summary.setup_failures += 1;
            }
            let ok = report.succeeded() as u64;
            summary.probes_ok += ok;
            summary.probes_failed += report.probes.len() as u64 - ok;

            if report.sink_closed() {
                summary.stop_reason = StopReason::SinkClosed;
                break;
            }
            if self
                .context
                .max_cycles
                .is_some_and(|max| summary.cycles >= max)
            {
                summary.stop_reason = StopReason::CycleLimit;
                break;
            }
            if self.shutdown.wait_timeout(self.context.interval) {
                summary.stop_reason = StopReason::Shutdown;
                break;
            }
        }

        tracing::debug!(
            worker = self.id,
            cycles = summary.cycles,
            reason = ?summary.stop_reason,
            "Worker stopped"
        );
        summary
    }
}

impl<P: RemoteSessionProvider> std::fmt::Debug for WorkerLoop<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerLoop")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
