//! `fleetprobe` - persistent SSH fleet poller
//!
//! Keeps one authenticated session per host and runs the configured probes
//! over it every interval, writing `timestamp | host | label | output`
//! records to stdout or a file.

mod cli;
mod commands;
mod error;
mod util;

use clap::Parser;
use cli::Cli;
use error::CliError;
use fleetprobe_core::tracing::{TracingConfig, TracingLevel, TracingOutput, init_tracing};

fn main() {
    let cli = Cli::parse();

    let result = init_logging(&cli)
        .and_then(|()| commands::dispatch(cli.config.as_deref(), cli.command));

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn init_logging(cli: &Cli) -> Result<(), CliError> {
    let level = TracingLevel::from_verbosity(cli.verbose, cli.quiet);
    let mut config = TracingConfig::new()
        .with_level(level)
        .with_thread_names(level >= TracingLevel::Debug);
    if cli.verbose == 0 && !cli.quiet {
        // Lifecycle messages from the binary stay visible by default.
        config = config.with_filter("fleetprobe_core=warn,fleetprobe=info");
    }
    if let Some(path) = &cli.log_file {
        config = config.with_output(TracingOutput::File(path.clone()));
    }
    init_tracing(&config).map_err(|e| CliError::Logging(e.to_string()))
}
