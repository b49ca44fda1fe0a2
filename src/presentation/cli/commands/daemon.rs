use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};

use crate::application::services::governor::Governor;
use crate::domain::entities::alert::Alert;
use crate::presentation::cli::formatters::status_fmt::colorize_severity;

/// How long background loops get to exit after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Start the governor's background loops and run until SIGINT or SIGTERM.
///
/// Failing health probes and metric errors are logged by the loops
/// themselves and never stop the daemon.
///
/// # Errors
///
/// Returns an error if the signal handlers cannot be installed.
pub async fn run_daemon(governor: &Governor) -> anyhow::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    governor.register_alert_callback(print_alert);
    governor.start();
    let status = governor.get_status().await;
    tracing::info!(
        "Daemon started: level {}, reliability {:.2}",
        governor.current_level(),
        status.reliability_score
    );

    tokio::select! {
        result = &mut interrupt => {
            if let Err(e) = result {
                tracing::warn!("Failed to listen for Ctrl+C: {e}");
            }
            tracing::info!("Interrupt received, shutting down");
        }
        _ = terminate.recv() => {
            tracing::info!("Terminate received, shutting down");
        }
    }

    governor.shutdown(SHUTDOWN_TIMEOUT).await;
    println!("\nwarden stopped");
    Ok(())
}

#[allow(clippy::unnecessary_wraps)]
fn print_alert(alert: &Alert) -> anyhow::Result<()> {
    println!(
        "{} {} {}",
        alert.timestamp().format("%H:%M:%S"),
        colorize_severity(alert.severity()),
        alert.message()
    );
    Ok(())
}
