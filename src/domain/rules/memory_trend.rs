use serde_json::json;

use crate::domain::entities::alert::{kind, Alert};
use crate::domain::entities::window::SnapshotWindow;
use crate::domain::value_objects::severity::Severity;
use crate::domain::value_objects::thresholds::ThresholdSet;
use crate::domain::value_objects::trend_settings::TrendSettings;

use super::Analyzer;

pub struct MemoryTrendAnalyzer;

/// Least-squares slope of memory percent against elapsed minutes.
///
/// `None` when the window spans no time or every sample shares a timestamp.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn memory_slope_per_minute(window: &SnapshotWindow) -> Option<f64> {
    let first = window.iter().next()?.timestamp;
    let points: Vec<(f64, f64)> = window
        .iter()
        .map(|s| {
            let minutes = (s.timestamp - first).num_milliseconds() as f64 / 60_000.0;
            (minutes, s.memory_percent)
        })
        .collect();

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let numerator: f64 = points
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let denominator: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();

    (denominator > f64::EPSILON).then(|| numerator / denominator)
}

impl Analyzer for MemoryTrendAnalyzer {
    fn name(&self) -> &'static str {
        kind::MEMORY_TREND
    }

    fn analyze(
        &self,
        window: &SnapshotWindow,
        _thresholds: &ThresholdSet,
        settings: &TrendSettings,
    ) -> Option<Alert> {
        if window.len() < settings.min_trend_samples.max(2) {
            return None;
        }
        let slope = memory_slope_per_minute(window)?;
        if slope <= settings.memory_rate_per_minute {
            return None;
        }

        let current = window.latest()?.memory_percent;
        let minutes = ((settings.projection_target_percent - current) / slope).max(0.0);
        let severity = if minutes < settings.emergency_minutes {
            Severity::Emergency
        } else if minutes < settings.critical_minutes {
            Severity::Critical
        } else {
            return None;
        };

        Some(Alert::new(
            severity,
            kind::MEMORY_TREND,
            format!(
                "Memory rising {slope:.1}%/min, {:.0}% in ~{minutes:.1} min",
                settings.projection_target_percent
            ),
            json!({
                "rate_per_minute": slope,
                "projected_minutes": minutes,
                "current_percent": current,
            }),
        ))
    }
}
