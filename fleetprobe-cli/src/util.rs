//! Shared utility functions used across command modules.

use std::path::Path;

use fleetprobe_core::config::{PollerSettings, Scheduling};
use fleetprobe_core::credentials::Credentials;
use fleetprobe_core::error::ConfigError;
use secrecy::SecretString;

use crate::cli::SettingsArgs;
use crate::error::CliError;

/// Settings file picked up from the working directory when `-c` is absent
pub const DEFAULT_CONFIG_FILE: &str = "fleetprobe.toml";

/// Environment variable holding the login password
pub const PASSWORD_ENV: &str = "FLEETPROBE_PASSWORD";

/// Loads settings, applies command-line overrides and validates the result
pub fn load_settings(
    config_path: Option<&Path>,
    overrides: &SettingsArgs,
) -> Result<PollerSettings, CliError> {
    let mut settings = match config_path {
        Some(path) => PollerSettings::load(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            PollerSettings::load(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => PollerSettings::default(),
    };
    apply_overrides(&mut settings, overrides);
    settings.validate()?;
    Ok(settings)
}

fn apply_overrides(settings: &mut PollerSettings, overrides: &SettingsArgs) {
    if let Some(hosts) = &overrides.hosts {
        settings.hosts_file.clone_from(hosts);
    }
    if let Some(interval) = overrides.interval {
        settings.interval_secs = interval;
    }
    if let Some(port) = overrides.port {
        settings.port = port;
    }
    if let Some(output) = &overrides.output {
        settings.output = Some(output.clone());
    }
    if let Some(cycles) = overrides.cycles {
        settings.max_cycles = Some(cycles);
    }
    if let Some(workers) = overrides.shared_workers {
        settings.scheduling = Scheduling::Shared;
        settings.workers = Some(workers);
    }
}

/// Builds credentials from `--user` and the password env var or a prompt
pub fn read_credentials(user: Option<String>) -> Result<Credentials, CliError> {
    let username = user
        .filter(|u| !u.trim().is_empty())
        .ok_or(ConfigError::MissingUsername)?;

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password(format!("Password for {username}: "))?,
    };

    Ok(Credentials::new(username, SecretString::from(password))?)
}
