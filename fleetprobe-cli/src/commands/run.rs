//! Polling command.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use fleetprobe_core::provider::Ssh2Provider;
use fleetprobe_core::sink::OutputSink;
use fleetprobe_core::supervisor::Supervisor;
use fleetprobe_core::worker::{PollContext, ShutdownSignal};

use crate::cli::SettingsArgs;
use crate::error::CliError;
use crate::util::{load_settings, read_credentials};

/// Run command handler
pub fn cmd_run(
    config_path: Option<&Path>,
    overrides: &SettingsArgs,
    user: Option<String>,
) -> Result<(), CliError> {
    let settings = load_settings(config_path, overrides)?;
    let probes = settings.probe_set()?;
    // Host list first: an empty list fails before any prompt.
    let hosts = settings.load_hosts()?;
    let credentials = read_credentials(user)?;

    let sink = match &settings.output {
        Some(path) => OutputSink::append_to_file(path)?,
        None => OutputSink::stdout(),
    };

    let mut context = PollContext::new(credentials, probes, settings.interval());
    context.max_cycles = settings.max_cycles;

    let supervisor = Supervisor::new(
        Arc::new(Ssh2Provider::new(settings.ssh_options())),
        Arc::new(sink),
        context,
    )
    .with_scheduling(settings.scheduling, settings.workers);

    install_interrupt_handler(supervisor.shutdown_signal())?;

    tracing::info!(
        hosts = hosts.len(),
        scheduling = %settings.scheduling,
        "Polling fleet"
    );
    let report = supervisor.run(hosts.into_vec())?;

    tracing::info!(
        cycles = report.cycles(),
        records = report.records_written,
        interrupted = report.interrupted,
        "Done"
    );
    Ok(())
}

/// First interrupt stops the poller cooperatively, a second one exits at once
fn install_interrupt_handler(shutdown: ShutdownSignal) -> Result<(), CliError> {
    let interrupts = AtomicU8::new(0);
    ctrlc::set_handler(move || {
        if interrupts.fetch_add(1, Ordering::SeqCst) == 0 {
            eprintln!("\nReceived interrupt, finishing in-flight records and closing sessions...");
            shutdown.trigger();
        } else {
            eprintln!("\nReceived second interrupt, exiting immediately");
            std::process::exit(0);
        }
    })
    .map_err(|e| CliError::Signal(e.to_string()))
}
