use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::entities::snapshot::Snapshot;
use crate::domain::value_objects::op_class::OpClass;
use crate::domain::value_objects::operation_profile::OperationProfile;
use crate::domain::value_objects::performance_level::PerformanceLevel;

struct Band {
    level: PerformanceLevel,
    memory: f64,
    cpu: f64,
    processes: usize,
}

// Worst band first.
const BANDS: [Band; 3] = [
    Band {
        level: PerformanceLevel::Emergency,
        memory: 95.0,
        cpu: 95.0,
        processes: 8,
    },
    Band {
        level: PerformanceLevel::Minimal,
        memory: 90.0,
        cpu: 85.0,
        processes: 6,
    },
    Band {
        level: PerformanceLevel::Reduced,
        memory: 80.0,
        cpu: 75.0,
        processes: 4,
    },
];

/// Derives the performance level from a single snapshot. Pure and stateless.
#[must_use]
pub fn level_for(snapshot: &Snapshot) -> PerformanceLevel {
    BANDS
        .iter()
        .find(|band| {
            snapshot.memory_percent >= band.memory
                || snapshot.cpu_percent >= band.cpu
                || snapshot.matched_process_count >= band.processes
        })
        .map_or(PerformanceLevel::Optimal, |band| band.level)
}

/// Caller-requested pacing limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationParameters {
    pub batch_size: usize,
    pub pause: Duration,
    pub max_output_lines: usize,
    pub max_file_size_mb: u64,
}

impl From<&OperationProfile> for OperationParameters {
    fn from(profile: &OperationProfile) -> Self {
        Self {
            batch_size: profile.batch_size,
            pause: profile.pause_between_batches,
            max_output_lines: profile.max_output_lines,
            max_file_size_mb: profile.max_file_size_mb,
        }
    }
}

/// Tightens `requested` to `profile`: sizes only go down, pauses only go up.
///
/// Never loosens a value the caller already set tighter, so applying it twice
/// yields the same result.
#[must_use]
pub fn adapt_parameters(
    requested: &OperationParameters,
    profile: &OperationProfile,
) -> OperationParameters {
    OperationParameters {
        batch_size: requested.batch_size.min(profile.batch_size),
        pause: requested.pause.max(profile.pause_between_batches),
        max_output_lines: requested.max_output_lines.min(profile.max_output_lines),
        max_file_size_mb: requested.max_file_size_mb.min(profile.max_file_size_mb),
    }
}

/// Whether to postpone an operation, with the reason either way
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferDecision {
    pub defer: bool,
    pub reason: String,
}

/// EMERGENCY runs only read/status/cleanup, MINIMAL also refuses analysis,
/// REDUCED refuses bulk and parallel, OPTIMAL runs everything.
#[must_use]
pub fn should_defer(op_class: OpClass, level: PerformanceLevel) -> DeferDecision {
    let required = op_class.required_level();
    if level.satisfies(required) {
        DeferDecision {
            defer: false,
            reason: format!("{op_class} runs at {level}"),
        }
    } else {
        DeferDecision {
            defer: true,
            reason: format!("{op_class} deferred: level {level} is below the required {required}"),
        }
    }
}
