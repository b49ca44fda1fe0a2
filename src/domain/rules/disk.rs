use serde_json::json;

use crate::domain::entities::alert::{kind, Alert};
use crate::domain::entities::window::SnapshotWindow;
use crate::domain::value_objects::severity::Severity;
use crate::domain::value_objects::thresholds::ThresholdSet;
use crate::domain::value_objects::trend_settings::TrendSettings;

use super::Analyzer;

pub struct DiskSpaceAnalyzer;

impl Analyzer for DiskSpaceAnalyzer {
    fn name(&self) -> &'static str {
        kind::DISK_SPACE
    }

    #[allow(clippy::cast_precision_loss)]
    fn analyze(
        &self,
        window: &SnapshotWindow,
        thresholds: &ThresholdSet,
        _settings: &TrendSettings,
    ) -> Option<Alert> {
        let latest = window.latest()?;
        let severity = if latest.disk_percent >= thresholds.disk_critical {
            Severity::Critical
        } else if latest.disk_percent >= thresholds.disk_warning {
            Severity::Warning
        } else {
            return None;
        };
        let free_gb = latest.disk_free_bytes as f64 / 1_073_741_824.0;

        Some(Alert::new(
            severity,
            kind::DISK_SPACE,
            format!(
                "Disk {:.1}% full ({free_gb:.1} GB free)",
                latest.disk_percent
            ),
            json!({
                "disk_percent": latest.disk_percent,
                "free_bytes": latest.disk_free_bytes,
            }),
        ))
    }
}
