use serde::{Deserialize, Serialize};

use crate::domain::entities::alert::{Resource, ThresholdAlert};
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::value_objects::op_class::OpClass;
use crate::domain::value_objects::severity::ThresholdSeverity;
use crate::domain::value_objects::thresholds::ThresholdSet;

/// Outcome of an admission check. Never an error: a refusal is a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    pub allowed: bool,
    pub reason: String,
}

impl AdmissionDecision {
    #[must_use]
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

fn percent_alert(
    resource: Resource,
    value: f64,
    warning: f64,
    critical: f64,
) -> Option<ThresholdAlert> {
    let (severity, threshold) = if value >= critical {
        (ThresholdSeverity::Critical, critical)
    } else if value >= warning {
        (ThresholdSeverity::Warning, warning)
    } else {
        return None;
    };
    Some(ThresholdAlert {
        resource,
        severity,
        value,
        threshold,
        message: format!(
            "{resource} at {value:.1}% ({} threshold: {threshold:.1}%)",
            severity.to_string().to_lowercase()
        ),
    })
}

/// Evaluates one snapshot against single-sample thresholds.
///
/// Pure: snapshot + thresholds in, breaches out.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn evaluate(snapshot: &Snapshot, thresholds: &ThresholdSet) -> Vec<ThresholdAlert> {
    let mut alerts: Vec<ThresholdAlert> = [
        percent_alert(
            Resource::Memory,
            snapshot.memory_percent,
            thresholds.memory_warning,
            thresholds.memory_critical,
        ),
        percent_alert(
            Resource::Cpu,
            snapshot.cpu_percent,
            thresholds.cpu_warning,
            thresholds.cpu_critical,
        ),
        percent_alert(
            Resource::Disk,
            snapshot.disk_percent,
            thresholds.disk_warning,
            thresholds.disk_critical,
        ),
    ]
    .into_iter()
    .flatten()
    .collect();

    let count = snapshot.matched_process_count;
    if count > thresholds.max_processes {
        alerts.push(ThresholdAlert {
            resource: Resource::Processes,
            severity: ThresholdSeverity::Warning,
            value: count as f64,
            threshold: thresholds.max_processes as f64,
            message: format!(
                "{count} matched processes (limit: {})",
                thresholds.max_processes
            ),
        });
    }

    if snapshot.matched_process_memory_mb > thresholds.process_memory_mb {
        alerts.push(ThresholdAlert {
            resource: Resource::ProcessMemory,
            severity: ThresholdSeverity::Warning,
            value: snapshot.matched_process_memory_mb as f64,
            threshold: thresholds.process_memory_mb as f64,
            message: format!(
                "largest matched process uses {} MB (ceiling: {} MB)",
                snapshot.matched_process_memory_mb, thresholds.process_memory_mb
            ),
        });
    }

    alerts
}

/// Decides whether an operation of `op_class` may start now.
///
/// Any critical breach, or more matched processes than the maximum, refuses
/// every class. `bulk` is additionally refused above the bulk memory and
/// process limits.
#[must_use]
pub fn admit(snapshot: &Snapshot, thresholds: &ThresholdSet, op_class: OpClass) -> AdmissionDecision {
    let mut reasons: Vec<String> = evaluate(snapshot, thresholds)
        .into_iter()
        .filter(|alert| {
            alert.severity == ThresholdSeverity::Critical || alert.resource == Resource::Processes
        })
        .map(|alert| alert.message)
        .collect();

    if op_class == OpClass::Bulk {
        if snapshot.memory_percent > thresholds.bulk_memory_limit {
            reasons.push(format!(
                "memory at {:.1}% exceeds the bulk limit of {:.1}%",
                snapshot.memory_percent, thresholds.bulk_memory_limit
            ));
        }
        if snapshot.matched_process_count > thresholds.bulk_max_processes {
            reasons.push(format!(
                "{} matched processes exceed the bulk limit of {}",
                snapshot.matched_process_count, thresholds.bulk_max_processes
            ));
        }
    }

    if reasons.is_empty() {
        AdmissionDecision::allow(format!("{op_class} admitted: resources within limits"))
    } else {
        AdmissionDecision::deny(format!("{op_class} denied: {}", reasons.join("; ")))
    }
}
