use colored::{ColoredString, Colorize};

use crate::domain::value_objects::performance_level::PerformanceLevel;
use crate::domain::value_objects::severity::Severity;

/// Horizontal gauge coloured against the resource's own warning/critical bands.
#[must_use]
pub fn progress_bar(value: f64, warning: f64, critical: f64, width: usize) -> String {
    let ratio = (value / 100.0).clamp(0.0, 1.0);
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let filled = (ratio * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);

    let bar_filled = "█".repeat(filled);
    let bar_empty = "░".repeat(empty);

    let colored_bar = if value >= critical {
        bar_filled.red().bold()
    } else if value >= warning {
        bar_filled.yellow()
    } else {
        bar_filled.green()
    };

    format!("{colored_bar}{bar_empty}")
}

#[must_use]
pub fn colorize_percent(value: f64, warning: f64, critical: f64) -> ColoredString {
    let text = format!("{value:.1}%");
    if value >= critical {
        text.red().bold()
    } else if value >= warning {
        text.yellow()
    } else {
        text.green()
    }
}

#[must_use]
pub fn colorize_level(level: PerformanceLevel) -> ColoredString {
    let text = level.to_string();
    match level {
        PerformanceLevel::Optimal => text.green().bold(),
        PerformanceLevel::Reduced => text.yellow().bold(),
        PerformanceLevel::Minimal => text.red(),
        PerformanceLevel::Emergency => text.red().bold().reversed(),
    }
}

#[must_use]
pub fn colorize_severity(severity: Severity) -> ColoredString {
    let text = format!("[{severity}]");
    match severity {
        Severity::Info => text.blue(),
        Severity::Warning => text.yellow(),
        Severity::Critical => text.red().bold(),
        Severity::Emergency => text.red().bold().reversed(),
    }
}

/// Reliability score in `[0, 1]` shown as a percentage.
#[must_use]
pub fn format_score(score: f64) -> ColoredString {
    let text = format!("{:.0}%", score * 100.0);
    if score >= 0.9 {
        text.green()
    } else if score >= 0.7 {
        text.yellow()
    } else {
        text.red().bold()
    }
}

#[must_use]
pub fn format_admission(allowed: bool) -> ColoredString {
    if allowed {
        "allow".green()
    } else {
        "deny ".red().bold()
    }
}

pub fn print_section_header(title: &str) {
    println!("{}", title.bold().cyan());
    let display_width = title.chars().count();
    println!("{}", "─".repeat(display_width).cyan());
}
