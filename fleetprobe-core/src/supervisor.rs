//! Worker supervision
//!
//! The supervisor builds one [`HostSlot`] per host, spawns the workers and
//! blocks until they stop. Teardown always runs in the same order: close the
//! sink so no new record starts, join every worker, then close every session
//! that is still open.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::Scheduling;
use crate::error::{ConfigError, FleetError, FleetResult};
use crate::provider::RemoteSessionProvider;
use crate::queue::JobQueue;
use crate::session::HostSlot;
use crate::sink::OutputSink;
use crate::worker::{HostSource, PollContext, ShutdownSignal, WorkerLoop, WorkerSummary};

/// How often the supervisor checks whether all workers have finished
const SUPERVISE_TICK: Duration = Duration::from_millis(100);

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Per-worker totals, in worker order
    pub workers: Vec<WorkerSummary>,
    /// Sessions that were open at teardown and got closed
    pub sessions_closed: usize,
    /// Records started over the whole run
    pub records_written: u64,
    /// Whether the run ended because shutdown was requested
    pub interrupted: bool,
}

impl RunReport {
    /// Total cycles across workers
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.workers.iter().map(|w| w.cycles).sum()
    }
}

/// Spawns and supervises the workers for one host list
pub struct Supervisor<P: RemoteSessionProvider> {
    provider: Arc<P>,
    sink: Arc<OutputSink>,
    context: Arc<PollContext>,
    scheduling: Scheduling,
    workers: Option<usize>,
    shutdown: ShutdownSignal,
}

impl<P: RemoteSessionProvider> Supervisor<P> {
    /// Creates a supervisor with dedicated scheduling
    #[must_use]
    pub fn new(provider: Arc<P>, sink: Arc<OutputSink>, context: PollContext) -> Self {
        Self {
            provider,
            sink,
            context: Arc::new(context),
            scheduling: Scheduling::Dedicated,
            workers: None,
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Selects the scheduling mode; `workers` is the pool size for `Shared`
    #[must_use]
    pub const fn with_scheduling(mut self, scheduling: Scheduling, workers: Option<usize>) -> Self {
        self.scheduling = scheduling;
        self.workers = workers;
        self
    }

    /// Handle for requesting shutdown from another thread or a signal handler
    #[must_use]
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Polls `hosts` until every worker stops.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty host list (before any
    /// thread is spawned), `FleetError::Spawn` if a worker thread cannot be
    /// started, or `FleetError::WorkerPanicked` if one panicked. Sessions are
    /// closed in every case once workers have started.
    pub fn run(&self, hosts: Vec<String>) -> FleetResult<RunReport> {
        if hosts.is_empty() {
            return Err(ConfigError::EmptyHostList.into());
        }
        let _span = tracing::info_span!(
            crate::tracing::span_names::SUPERVISOR_RUN,
            hosts = hosts.len(),
            scheduling = %self.scheduling
        )
        .entered();

        let slots: Vec<Arc<HostSlot<P>>> = hosts.into_iter().map(|h| Arc::new(HostSlot::new(h))).collect();
        let queue = Arc::new(JobQueue::new(slots.clone())?);
        let sources = self.sources(&queue);

        tracing::info!(
            hosts = slots.len(),
            workers = sources.len(),
            probes = self.context.probes.len(),
            interval_secs = self.context.interval.as_secs(),
            "Starting poller"
        );

        let mut handles = Vec::with_capacity(sources.len());
        let mut spawn_error = None;
        for (id, source) in sources.into_iter().enumerate() {
            match self.spawn_worker(id, source) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    tracing::error!(worker = id, error = %e, "Failed to spawn worker thread");
                    spawn_error = Some(e);
                    self.shutdown.trigger();
                    break;
                }
            }
        }

        while !self.shutdown.is_triggered() && !handles.iter().all(JoinHandle::is_finished) {
            self.shutdown.wait_timeout(SUPERVISE_TICK);
        }
        let interrupted = self.shutdown.is_triggered();
        if interrupted {
            tracing::info!("Shutdown requested, stopping workers");
        }
        self.sink.close();

        let mut summaries = Vec::with_capacity(handles.len());
        let mut panicked = None;
        for handle in handles {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            match handle.join() {
                Ok(summary) => summaries.push(summary),
                Err(_) => {
                    tracing::error!(thread = %name, "Worker thread panicked");
                    panicked.get_or_insert(name);
                }
            }
        }

        let sessions_closed = self.close_sessions(&slots);

        if let Some(e) = spawn_error {
            return Err(FleetError::Spawn(e));
        }
        if let Some(name) = panicked {
            return Err(FleetError::WorkerPanicked(name));
        }

        let report = RunReport {
            workers: summaries,
            sessions_closed,
            records_written: self.sink.records_written(),
            interrupted,
        };
        tracing::info!(
            cycles = report.cycles(),
            records = report.records_written,
            sessions_closed,
            "Poller stopped"
        );
        Ok(report)
    }

    fn sources(&self, queue: &Arc<JobQueue<Arc<HostSlot<P>>>>) -> Vec<HostSource<P>> {
        match self.scheduling {
            // Fairness of the rotation hands each host out exactly once here.
            Scheduling::Dedicated => (0..queue.len())
                .map(|_| HostSource::Bound(Arc::clone(queue.next())))
                .collect(),
            Scheduling::Shared => {
                let count = self.workers.unwrap_or(queue.len()).max(1);
                (0..count).map(|_| HostSource::Queue(Arc::clone(queue))).collect()
            }
        }
    }

    fn spawn_worker(&self, id: usize, source: HostSource<P>) -> std::io::Result<JoinHandle<WorkerSummary>> {
        let name = match &source {
            HostSource::Bound(slot) => format!("fleetprobe-{}", slot.address()),
            HostSource::Queue(_) => format!("fleetprobe-worker-{id}"),
        };
        let worker = WorkerLoop::new(
            id,
            Arc::clone(&self.provider),
            Arc::clone(&self.sink),
            Arc::clone(&self.context),
            self.shutdown.clone(),
        );
        thread::Builder::new()
            .name(name)
            .spawn(move || worker.run(&source))
    }

    fn close_sessions(&self, slots: &[Arc<HostSlot<P>>]) -> usize {
        slots
            .iter()
            .filter(|slot| slot.lock().close(self.provider.as_ref()))
            .count()
    }
}

impl<P: RemoteSessionProvider> std::fmt::Debug for Supervisor<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("scheduling", &self.scheduling)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}
