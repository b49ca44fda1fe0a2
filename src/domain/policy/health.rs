use crate::domain::entities::snapshot::Snapshot;

const HEALTHY_MEMORY_BELOW: f64 = 90.0;
const HEALTHY_CPU_BELOW: f64 = 95.0;
const HEALTHY_DISK_BELOW: f64 = 95.0;

const COMPONENT_WEIGHT: f64 = 0.6;
const SYSTEM_WEIGHT: f64 = 0.4;

#[must_use]
pub fn system_healthy(snapshot: &Snapshot) -> bool {
    snapshot.memory_percent < HEALTHY_MEMORY_BELOW
        && snapshot.cpu_percent < HEALTHY_CPU_BELOW
        && snapshot.disk_percent < HEALTHY_DISK_BELOW
}

/// `0.6 * active/total + 0.4 * (healthy ? 1 : 0.5)`, always within `[0, 1]`.
///
/// With no registered components the component term counts as fully active.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn reliability_score(active: usize, total: usize, system_healthy: bool) -> f64 {
    let ratio = if total == 0 {
        1.0
    } else {
        active.min(total) as f64 / total as f64
    };
    let system = if system_healthy { 1.0 } else { 0.5 };
    (COMPONENT_WEIGHT * ratio + SYSTEM_WEIGHT * system).clamp(0.0, 1.0)
}
