//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// `fleetprobe` polls a fleet of hosts over persistent SSH sessions
#[derive(Parser)]
#[command(name = "fleetprobe")]
#[command(author, version, about = "Persistent SSH fleet poller")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the settings file (default: ./fleetprobe.toml if present)
    #[arg(short, long, global = true, env = "FLEETPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for values from the settings file
#[derive(Debug, Clone, Default, Args)]
pub struct SettingsArgs {
    /// Host list file, one address per line
    #[arg(short = 'H', long, value_name = "PATH")]
    pub hosts: Option<PathBuf>,

    /// Seconds between probe rounds
    #[arg(short, long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// SSH port on every host
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Append records to this file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Stop each worker after this many cycles
    #[arg(long, value_name = "N")]
    pub cycles: Option<u64>,

    /// Use a pool of N workers over a shared rotation instead of one per host
    #[arg(long, value_name = "N")]
    pub shared_workers: Option<usize>,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Poll every host until interrupted
    #[command(about = "Poll every host until interrupted or the cycle limit is reached")]
    Run {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Login name on every host
        #[arg(short, long, env = "FLEETPROBE_USER")]
        user: Option<String>,
    },

    /// Validate settings and host list
    #[command(about = "Validate settings and host list, optionally logging in to every host")]
    Check {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Also connect and authenticate to every host once
        #[arg(long)]
        connect: bool,

        /// Login name, required with --connect
        #[arg(short, long, env = "FLEETPROBE_USER")]
        user: Option<String>,
    },

    /// Print the effective probe set
    #[command(about = "Print the probes that run against every host")]
    Probes,
}
