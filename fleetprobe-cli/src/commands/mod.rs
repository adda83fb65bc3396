//! Command handler modules for the CLI.

mod check;
mod probes;
mod run;

use std::path::Path;

use crate::cli::Commands;
use crate::error::CliError;

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(config_path: Option<&Path>, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Run { settings, user } => run::cmd_run(config_path, &settings, user),
        Commands::Check {
            settings,
            connect,
            user,
        } => check::cmd_check(config_path, &settings, connect, user),
        Commands::Probes => probes::cmd_probes(config_path),
    }
}
