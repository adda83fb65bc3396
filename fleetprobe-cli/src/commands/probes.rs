//! Probe listing command.

use std::path::Path;

use crate::cli::SettingsArgs;
use crate::error::CliError;
use crate::util::load_settings;

/// Probes command handler
pub fn cmd_probes(config_path: Option<&Path>) -> Result<(), CliError> {
    let settings = load_settings(config_path, &SettingsArgs::default())?;
    let probes = settings.probe_set()?;

    let width = probes.labels().map(str::len).max().unwrap_or(0);
    for probe in &probes {
        println!("{:<width$}  {}", probe.label, probe.command);
    }
    Ok(())
}
