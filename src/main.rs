use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use warden::application::config::AppConfig;
use warden::application::services::governor::{Governor, GovernorPorts};
use warden::infrastructure::collectors::sysinfo_collector::SysinfoCollector;
use warden::infrastructure::notifications::log_file::JsonlAlertLog;
use warden::infrastructure::os::process_manager::OsProcessManager;
use warden::infrastructure::persistence::status_file::JsonStatusFile;
use warden::presentation::cli::app::{Cli, Commands};
use warden::presentation::cli::commands::config::run_config;
use warden::presentation::cli::commands::daemon::run_daemon;
use warden::presentation::cli::commands::exec::run_exec;
use warden::presentation::cli::commands::status::run_status;

fn print_banner() {
    println!("{}", "━".repeat(40).cyan());
    println!("{}", "  WARDEN · Adaptive Resource Governor".bold().cyan());
    println!("{}", "━".repeat(40).cyan());
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_governor(config: &AppConfig) -> Governor {
    // Manual DI: main.rs is the only place that knows concrete types
    let ports = GovernorPorts {
        metrics: Arc::new(SysinfoCollector::new(&config.process_patterns)),
        processes: Arc::new(OsProcessManager::new()),
        publisher: Arc::new(JsonStatusFile::new(config.status_file_path())),
        alert_log: Arc::new(JsonlAlertLog::at(config.alert_log_path())),
    };
    Governor::new(ports, config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    let config_path = match cli.config {
        Some(ref path) => path.clone(),
        None => AppConfig::config_path()?,
    };
    let mut config = if cli.config.is_some() {
        AppConfig::load_from(&config_path)?
    } else {
        AppConfig::load()?
    };

    match cli.command {
        Some(Commands::Status { json }) => {
            let collector = SysinfoCollector::new(&config.process_patterns);
            run_status(&collector, &config, json)?;
        }
        Some(Commands::Exec {
            timeout,
            grace,
            class,
            force,
            command,
        }) => {
            if let Some(grace) = grace {
                config.timeouts.subprocess_grace_seconds = grace;
            }
            let governor = build_governor(&config);
            let code =
                run_exec(&governor, &command, Duration::from_secs(timeout), class, force).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Some(Commands::Config { init }) => {
            run_config(&config, &config_path, init)?;
        }
        Some(Commands::Daemon) | None => {
            print_banner();
            let governor = build_governor(&config);
            run_daemon(&governor).await?;
        }
    }

    Ok(())
}
