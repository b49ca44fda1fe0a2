use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::value_objects::op_class::OpClass;

/// warden: adaptive resource governor
///
/// Watches host pressure, paces and admits work accordingly, bounds
/// commands with escalating timeouts, and supervises its own components.
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(version, about, long_about)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to custom config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the early warning engine and health supervisor until interrupted
    #[command(alias = "d")]
    Daemon,

    /// Show current pressure, level and admission decisions
    #[command(alias = "s")]
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a command under a timeout with terminate-then-kill escalation
    #[command(alias = "x")]
    Exec {
        /// Timeout in seconds
        #[arg(short, long, default_value = "60")]
        timeout: u64,

        /// Grace period between terminate and kill, in seconds (default: config)
        #[arg(short, long)]
        grace: Option<u64>,

        /// Operation class checked for deferral before running
        #[arg(long, default_value = "standard")]
        class: OpClass,

        /// Run even if the current level would defer the class
        #[arg(short, long)]
        force: bool,

        /// Command and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Show or initialise the configuration file
    #[command(alias = "c")]
    Config {
        /// Write the default configuration if none exists
        #[arg(long)]
        init: bool,
    },
}
