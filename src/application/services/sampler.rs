use std::sync::Arc;

use crate::domain::entities::alert::ThresholdAlert;
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::policy::admission::{self, AdmissionDecision};
use crate::domain::ports::collector::{CollectionError, MetricsSource};
use crate::domain::value_objects::op_class::OpClass;
use crate::domain::value_objects::performance_level::PerformanceLevel;
use crate::domain::value_objects::thresholds::ThresholdSet;

/// Reads host metrics through the metrics port and applies single-sample thresholds.
pub struct ResourceSampler {
    source: Arc<dyn MetricsSource>,
    thresholds: ThresholdSet,
}

impl ResourceSampler {
    #[must_use]
    pub fn new(source: Arc<dyn MetricsSource>, thresholds: ThresholdSet) -> Self {
        Self { source, thresholds }
    }

    #[must_use]
    pub const fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    /// Take a fresh snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` if the metrics source cannot be read.
    pub fn sample(&self) -> Result<Snapshot, CollectionError> {
        self.source.collect()
    }

    #[must_use]
    pub fn evaluate(&self, snapshot: &Snapshot) -> Vec<ThresholdAlert> {
        admission::evaluate(snapshot, &self.thresholds)
    }

    /// Admission check against a fresh snapshot.
    ///
    /// Without metrics only the classes that are never deferred may run.
    #[must_use]
    pub fn admit(&self, op_class: OpClass) -> AdmissionDecision {
        match self.sample() {
            Ok(snapshot) => admission::admit(&snapshot, &self.thresholds, op_class),
            Err(e) => {
                tracing::warn!("Admission without metrics for {op_class}: {e}");
                if op_class.required_level() == PerformanceLevel::Emergency {
                    AdmissionDecision::allow(format!("{op_class} admitted: metrics unavailable ({e})"))
                } else {
                    AdmissionDecision::deny(format!("{op_class} denied: metrics unavailable ({e})"))
                }
            }
        }
    }

    /// Re-initialise the metrics source.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` if the source refuses to reset.
    pub fn reset(&self) -> Result<(), CollectionError> {
        self.source.reset()
    }
}
