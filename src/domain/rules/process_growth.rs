use serde_json::json;

use crate::domain::entities::alert::{kind, Alert};
use crate::domain::entities::window::SnapshotWindow;
use crate::domain::value_objects::severity::Severity;
use crate::domain::value_objects::thresholds::ThresholdSet;
use crate::domain::value_objects::trend_settings::TrendSettings;

use super::Analyzer;

const MIN_GROWTH_SAMPLES: usize = 3;

pub struct ProcessGrowthAnalyzer;

impl Analyzer for ProcessGrowthAnalyzer {
    fn name(&self) -> &'static str {
        kind::PROCESS_GROWTH
    }

    fn analyze(
        &self,
        window: &SnapshotWindow,
        _thresholds: &ThresholdSet,
        settings: &TrendSettings,
    ) -> Option<Alert> {
        if window.len() < MIN_GROWTH_SAMPLES {
            return None;
        }
        let lookback = window.len().min(settings.process_growth_lookback.max(MIN_GROWTH_SAMPLES));
        let recent = window.last_n(lookback)?;
        let first = recent.first()?.matched_process_count;
        let last = recent.last()?.matched_process_count;
        let growth = last.checked_sub(first)?;
        if growth < settings.process_growth_min.max(1) {
            return None;
        }

        Some(Alert::new(
            Severity::Warning,
            kind::PROCESS_GROWTH,
            format!("Matched processes grew from {first} to {last} over {lookback} samples"),
            json!({
                "from": first,
                "to": last,
                "growth": growth,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::test_support::window_of;

    fn counts(values: &[usize]) -> SnapshotWindow {
        let points: Vec<(f64, f64, usize)> = values.iter().map(|&p| (30.0, 10.0, p)).collect();
        window_of(30, &points)
    }

    fn run(window: &SnapshotWindow) -> Option<Alert> {
        ProcessGrowthAnalyzer.analyze(window, &ThresholdSet::default(), &TrendSettings::default())
    }

    #[test]
    fn rule_name() {
        assert_eq!(ProcessGrowthAnalyzer.name(), "process_growth");
    }

    #[test]
    fn growth_of_two_warns() {
        let alert = run(&counts(&[1, 2, 3]));
        assert!(matches!(alert, Some(ref a) if a.data()["growth"] == 2));
    }

    #[test]
    fn growth_of_one_is_ignored() {
        assert!(run(&counts(&[1, 1, 2])).is_none());
    }

    #[test]
    fn shrinking_is_ignored() {
        assert!(run(&counts(&[5, 4, 3])).is_none());
    }

    #[test]
    fn needs_three_samples() {
        assert!(run(&counts(&[1, 5])).is_none());
    }

    #[test]
    fn looks_back_five_samples_only() {
        // Growth happened before the lookback window.
        assert!(run(&counts(&[0, 4, 4, 4, 4, 4])).is_none());
        assert!(run(&counts(&[0, 2, 3, 4, 4, 4])).is_some());
    }
}
