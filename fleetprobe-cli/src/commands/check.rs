//! Settings and connectivity check command.

use std::path::Path;
use std::thread;

use fleetprobe_core::credentials::Credentials;
use fleetprobe_core::error::SessionError;
use fleetprobe_core::provider::{RemoteSessionProvider, Ssh2Provider};
use fleetprobe_core::session::HostSession;

use crate::cli::SettingsArgs;
use crate::error::CliError;
use crate::util::{load_settings, read_credentials};

/// Check command handler
pub fn cmd_check(
    config_path: Option<&Path>,
    overrides: &SettingsArgs,
    connect: bool,
    user: Option<String>,
) -> Result<(), CliError> {
    let settings = load_settings(config_path, overrides)?;
    let probes = settings.probe_set()?;
    let hosts = settings.load_hosts()?;

    println!(
        "Settings OK: {} hosts from {}, {} probes, every {}s, {} scheduling with {} workers",
        hosts.len(),
        settings.hosts_file.display(),
        probes.len(),
        settings.interval_secs,
        settings.scheduling,
        settings.worker_count(hosts.len()),
    );

    if !connect {
        return Ok(());
    }

    let credentials = read_credentials(user)?;
    let provider = Ssh2Provider::new(settings.ssh_options());
    println!("Connecting to {} hosts...\n", hosts.len());

    let results = check_hosts(&provider, &credentials, hosts.iter());
    let mut failed = 0usize;
    for (address, result) in &results {
        match result {
            Ok(()) => println!("  ok    {address}"),
            Err(e) => {
                failed += 1;
                println!("  FAIL  {e}");
            }
        }
    }
    println!();

    if failed > 0 {
        return Err(CliError::CheckFailed(format!(
            "{failed} of {} hosts failed",
            results.len()
        )));
    }
    println!("All {} hosts reachable", results.len());
    Ok(())
}

/// Sets up and tears down one session per host, all hosts in parallel
fn check_hosts<'a, P: RemoteSessionProvider>(
    provider: &P,
    credentials: &Credentials,
    hosts: impl Iterator<Item = &'a str>,
) -> Vec<(String, Result<(), SessionError>)> {
    thread::scope(|scope| {
        let handles: Vec<_> = hosts
            .map(|address| {
                let handle = scope.spawn(move || {
                    let mut session = HostSession::<P>::new(address);
                    let result = session.ensure_ready(provider, credentials);
                    session.close(provider);
                    result
                });
                (address, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(address, handle)| {
                let result = handle.join().unwrap_or_else(|_| {
                    Err(SessionError::Connect {
                        address: address.to_string(),
                        source: fleetprobe_core::error::ProviderError::new("check thread panicked"),
                    })
                });
                (address.to_string(), result)
            })
            .collect()
    })
}
