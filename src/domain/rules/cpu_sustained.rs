use serde_json::json;

use crate::domain::entities::alert::{kind, Alert};
use crate::domain::entities::window::SnapshotWindow;
use crate::domain::value_objects::severity::Severity;
use crate::domain::value_objects::thresholds::ThresholdSet;
use crate::domain::value_objects::trend_settings::TrendSettings;

use super::Analyzer;

pub struct CpuSustainedAnalyzer;

impl Analyzer for CpuSustainedAnalyzer {
    fn name(&self) -> &'static str {
        kind::CPU_SUSTAINED
    }

    #[allow(clippy::cast_precision_loss)]
    fn analyze(
        &self,
        window: &SnapshotWindow,
        _thresholds: &ThresholdSet,
        settings: &TrendSettings,
    ) -> Option<Alert> {
        let recent = window.last_n(settings.cpu_sustained_samples)?;
        if !recent
            .iter()
            .all(|s| s.cpu_percent > settings.cpu_sustained_percent)
        {
            return None;
        }
        let average = recent.iter().map(|s| s.cpu_percent).sum::<f64>() / recent.len() as f64;

        Some(Alert::new(
            Severity::Warning,
            kind::CPU_SUSTAINED,
            format!(
                "CPU above {:.0}% for the last {} samples (avg {average:.1}%)",
                settings.cpu_sustained_percent,
                recent.len()
            ),
            json!({
                "average_percent": average,
                "samples": recent.len(),
            }),
        ))
    }
}
