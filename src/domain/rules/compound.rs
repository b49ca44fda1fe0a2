use serde_json::json;

use crate::domain::entities::alert::{kind, Alert};
use crate::domain::entities::window::SnapshotWindow;
use crate::domain::value_objects::severity::Severity;
use crate::domain::value_objects::thresholds::ThresholdSet;
use crate::domain::value_objects::trend_settings::TrendSettings;

use super::Analyzer;

const MIN_CONDITIONS: usize = 2;

/// Raises CRITICAL when at least two of memory, CPU and process count stay at
/// or above their warning levels across every recent sample.
pub struct CompoundInstabilityAnalyzer;

impl Analyzer for CompoundInstabilityAnalyzer {
    fn name(&self) -> &'static str {
        kind::COMPOUND_INSTABILITY
    }

    fn analyze(
        &self,
        window: &SnapshotWindow,
        thresholds: &ThresholdSet,
        settings: &TrendSettings,
    ) -> Option<Alert> {
        let recent = window.last_n(settings.compound_samples)?;

        let mut conditions = Vec::new();
        if recent
            .iter()
            .all(|s| s.memory_percent >= thresholds.memory_warning)
        {
            conditions.push("memory");
        }
        if recent.iter().all(|s| s.cpu_percent >= thresholds.cpu_warning) {
            conditions.push("cpu");
        }
        if recent
            .iter()
            .all(|s| s.matched_process_count >= thresholds.max_processes)
        {
            conditions.push("processes");
        }

        if conditions.len() < MIN_CONDITIONS {
            return None;
        }

        Some(Alert::new(
            Severity::Critical,
            kind::COMPOUND_INSTABILITY,
            format!(
                "Compound pressure on {} over the last {} samples",
                conditions.join(" + "),
                recent.len()
            ),
            json!({ "conditions": conditions }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::test_support::window_of;

    fn run(window: &SnapshotWindow) -> Option<Alert> {
        CompoundInstabilityAnalyzer.analyze(
            window,
            &ThresholdSet::default(),
            &TrendSettings::default(),
        )
    }

    #[test]
    fn rule_name() {
        assert_eq!(CompoundInstabilityAnalyzer.name(), "compound_instability");
    }

    #[test]
    fn memory_and_cpu_together_are_critical() {
        let alert = run(&window_of(30, &[(82.0, 80.0, 1); 5]));
        assert!(matches!(alert, Some(ref a) if a.severity() == Severity::Critical));
    }

    #[test]
    fn memory_and_processes_together_are_critical() {
        let alert = run(&window_of(30, &[(82.0, 10.0, 5); 5]));
        assert!(alert.is_some());
    }

    #[test]
    fn single_condition_is_not_compound() {
        assert!(run(&window_of(30, &[(95.0, 10.0, 1); 5])).is_none());
    }

    #[test]
    fn condition_must_hold_on_every_sample() {
        let mut points = vec![(82.0, 80.0, 1); 5];
        points[2].1 = 40.0;
        assert!(run(&window_of(30, &points)).is_none());
    }

    #[test]
    fn needs_full_lookback() {
        assert!(run(&window_of(30, &[(82.0, 80.0, 6); 4])).is_none());
    }
}
