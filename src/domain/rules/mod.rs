pub mod compound;
pub mod cpu_sustained;
pub mod disk;
pub mod memory_trend;
pub mod process_growth;

use crate::domain::entities::alert::Alert;
use crate::domain::entities::window::SnapshotWindow;
use crate::domain::value_objects::thresholds::ThresholdSet;
use crate::domain::value_objects::trend_settings::TrendSettings;

/// A deterministic check over the rolling snapshot window.
/// Analyzers are pure functions: window + settings in, at most one alert out. No I/O.
pub trait Analyzer: Send + Sync {
    /// Returns the unique name of this analyzer
    fn name(&self) -> &'static str;

    /// Inspects the window and returns a detection, if any
    fn analyze(
        &self,
        window: &SnapshotWindow,
        thresholds: &ThresholdSet,
        settings: &TrendSettings,
    ) -> Option<Alert>;
}

/// Returns the default analyzers in evaluation order
#[must_use]
pub fn default_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(memory_trend::MemoryTrendAnalyzer),
        Box::new(cpu_sustained::CpuSustainedAnalyzer),
        Box::new(process_growth::ProcessGrowthAnalyzer),
        Box::new(compound::CompoundInstabilityAnalyzer),
        Box::new(disk::DiskSpaceAnalyzer),
    ]
}

/// Runs a fixed, ordered list of analyzers over a window
pub struct TrendAnalyzers {
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl TrendAnalyzers {
    #[must_use]
    pub fn new(analyzers: Vec<Box<dyn Analyzer>>) -> Self {
        Self { analyzers }
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    /// Detections in analyzer order. The order is stable so that repeated
    /// evaluation of the same window yields the same sequence.
    #[must_use]
    pub fn analyze(
        &self,
        window: &SnapshotWindow,
        thresholds: &ThresholdSet,
        settings: &TrendSettings,
    ) -> Vec<Alert> {
        self.analyzers
            .iter()
            .filter_map(|analyzer| analyzer.analyze(window, thresholds, settings))
            .collect()
    }
}

impl Default for TrendAnalyzers {
    fn default() -> Self {
        Self::new(default_analyzers())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::window_of;
    use super::*;
    use crate::domain::entities::alert::kind;
    use crate::domain::value_objects::severity::Severity;
    use serde_json::json;

    struct Fixed(&'static str);
    impl Analyzer for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }
        fn analyze(&self, _: &SnapshotWindow, _: &ThresholdSet, _: &TrendSettings) -> Option<Alert> {
            Some(Alert::new(Severity::Info, self.0, "fixed", json!({})))
        }
    }

    struct Silent;
    impl Analyzer for Silent {
        fn name(&self) -> &'static str {
            "silent"
        }
        fn analyze(&self, _: &SnapshotWindow, _: &ThresholdSet, _: &TrendSettings) -> Option<Alert> {
            None
        }
    }

    #[test]
    fn empty_engine_returns_nothing() {
        let engine = TrendAnalyzers::new(vec![]);
        let alerts = engine.analyze(
            &SnapshotWindow::new(),
            &ThresholdSet::default(),
            &TrendSettings::default(),
        );
        assert!(alerts.is_empty());
    }

    #[test]
    fn preserves_analyzer_order() {
        let engine = TrendAnalyzers::new(vec![
            Box::new(Fixed("b")),
            Box::new(Silent),
            Box::new(Fixed("a")),
        ]);
        let alerts = engine.analyze(
            &SnapshotWindow::new(),
            &ThresholdSet::default(),
            &TrendSettings::default(),
        );
        let kinds: Vec<&str> = alerts.iter().map(Alert::kind).collect();
        assert_eq!(kinds, vec!["b", "a"]);
    }

    #[test]
    fn default_order() {
        let engine = TrendAnalyzers::default();
        assert_eq!(
            engine.names(),
            vec![
                kind::MEMORY_TREND,
                kind::CPU_SUSTAINED,
                kind::PROCESS_GROWTH,
                kind::COMPOUND_INSTABILITY,
                kind::DISK_SPACE,
            ]
        );
    }

    #[test]
    fn quiet_window_produces_no_alerts() {
        let window = window_of(30, &[(40.0, 20.0, 1); 12]);
        let alerts = TrendAnalyzers::default().analyze(
            &window,
            &ThresholdSet::default(),
            &TrendSettings::default(),
        );
        assert!(alerts.is_empty());
    }
}
