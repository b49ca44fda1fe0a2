use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;

use crate::application::config::AppConfig;
use crate::domain::entities::alert::ThresholdAlert;
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::entities::status::StatusReport;
use crate::domain::policy::admission::{admit, evaluate, AdmissionDecision};
use crate::domain::policy::degradation::level_for;
use crate::domain::ports::collector::MetricsSource;
use crate::domain::value_objects::op_class::OpClass;
use crate::domain::value_objects::operation_profile::ProfileTable;
use crate::domain::value_objects::performance_level::PerformanceLevel;
use crate::domain::value_objects::severity::ThresholdSeverity;
use crate::domain::value_objects::thresholds::ThresholdSet;
use crate::infrastructure::persistence::status_file::JsonStatusFile;
use crate::presentation::cli::formatters::status_fmt::{
    colorize_level, colorize_percent, format_admission, format_score, print_section_header,
    progress_bar,
};

/// Everything `status` reports, as emitted with `--json`.
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub snapshot: Snapshot,
    pub level: PerformanceLevel,
    pub threshold_alerts: Vec<ThresholdAlert>,
    pub admission: BTreeMap<String, AdmissionDecision>,
    /// Last document published by a running daemon, if any
    pub supervisor: Option<StatusReport>,
}

impl StatusView {
    #[must_use]
    pub fn build(snapshot: Snapshot, thresholds: &ThresholdSet, supervisor: Option<StatusReport>) -> Self {
        let admission = OpClass::ALL
            .iter()
            .map(|class| (class.to_string(), admit(&snapshot, thresholds, *class)))
            .collect();
        Self {
            level: level_for(&snapshot),
            threshold_alerts: evaluate(&snapshot, thresholds),
            admission,
            snapshot,
            supervisor,
        }
    }
}

/// # Errors
///
/// Returns an error if system metrics collection or JSON serialization fails.
pub fn run_status(collector: &dyn MetricsSource, config: &AppConfig, json: bool) -> anyhow::Result<()> {
    // CPU usage is a delta between refreshes.
    std::thread::sleep(Duration::from_millis(500));
    let snapshot = collector
        .collect()
        .context("Failed to collect system metrics")?;

    let thresholds = ThresholdSet::from(config);
    let supervisor = JsonStatusFile::new(config.status_file_path()).read().ok();
    let view = StatusView::build(snapshot, &thresholds, supervisor);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    print_view(&view, &thresholds, &ProfileTable::from(config));
    Ok(())
}

fn print_view(view: &StatusView, t: &ThresholdSet, profiles: &ProfileTable) {
    let s = &view.snapshot;
    println!("{}", "warden: Resource Status".bold().cyan());
    println!("{}", "━".repeat(50));

    print_section_header("\nPressure");
    for (label, value, warning, critical) in [
        ("Memory", s.memory_percent, t.memory_warning, t.memory_critical),
        ("CPU   ", s.cpu_percent, t.cpu_warning, t.cpu_critical),
        ("Disk  ", s.disk_percent, t.disk_warning, t.disk_critical),
    ] {
        println!(
            "  {label} {} {}",
            progress_bar(value, warning, critical, 30),
            colorize_percent(value, warning, critical)
        );
    }
    println!(
        "  Workers: {} matched (limit {}), largest {} MB",
        s.matched_process_count, t.max_processes, s.matched_process_memory_mb
    );

    print_section_header("\nLevel");
    let profile = profiles.get(view.level);
    println!(
        "  {}  batch {} · pause {:?} · max output {} lines",
        colorize_level(view.level),
        profile.batch_size,
        profile.pause_between_batches,
        profile.max_output_lines
    );

    if !view.threshold_alerts.is_empty() {
        print_section_header("\nThresholds");
        for alert in &view.threshold_alerts {
            let tag = match alert.severity {
                ThresholdSeverity::Warning => "[WARNING]".yellow(),
                ThresholdSeverity::Critical => "[CRITICAL]".red().bold(),
            };
            println!("  {tag} {}", alert.message);
        }
    }

    print_section_header("\nAdmission");
    for (class, decision) in &view.admission {
        println!("  {class:<9} {}", format_admission(decision.allowed));
    }

    if let Some(report) = &view.supervisor {
        print_section_header("\nSupervisor");
        println!(
            "  Reliability {} · {}/{} components active · {} active alert(s)",
            format_score(report.reliability_score),
            report.active_components(),
            report.components.len(),
            report.active_alert_count
        );
        for (name, active) in &report.components {
            let mark = if *active { "up".green() } else { "down".red().bold() };
            println!("  {name:<14} {mark}");
        }
        println!(
            "  Last check: {}",
            report.last_health_check.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
}
