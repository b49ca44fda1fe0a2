use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::sampler::ResourceSampler;
use crate::domain::policy::degradation::{self, DeferDecision, OperationParameters};
use crate::domain::value_objects::op_class::OpClass;
use crate::domain::value_objects::operation_profile::{OperationProfile, ProfileTable};
use crate::domain::value_objects::performance_level::PerformanceLevel;

/// Level used when the host cannot be measured.
pub const FALLBACK_LEVEL: PerformanceLevel = PerformanceLevel::Reduced;

/// Derives the performance level from fresh samples and maps it to a profile.
///
/// Holds no level state: every query re-samples.
pub struct DegradationController {
    sampler: Arc<ResourceSampler>,
    profiles: ProfileTable,
    poll_interval: Duration,
}

impl DegradationController {
    #[must_use]
    pub fn new(sampler: Arc<ResourceSampler>, profiles: ProfileTable, poll_interval: Duration) -> Self {
        Self {
            sampler,
            profiles,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[must_use]
    pub const fn profiles(&self) -> &ProfileTable {
        &self.profiles
    }

    #[must_use]
    pub const fn profile(&self, level: PerformanceLevel) -> &OperationProfile {
        self.profiles.get(level)
    }

    #[must_use]
    pub fn current_level(&self) -> PerformanceLevel {
        match self.sampler.sample() {
            Ok(snapshot) => degradation::level_for(&snapshot),
            Err(e) => {
                tracing::warn!("Metrics unavailable, assuming {FALLBACK_LEVEL}: {e}");
                FALLBACK_LEVEL
            }
        }
    }

    #[must_use]
    pub fn adapt_parameters(
        &self,
        requested: &OperationParameters,
        level: PerformanceLevel,
    ) -> OperationParameters {
        degradation::adapt_parameters(requested, self.profiles.get(level))
    }

    #[must_use]
    pub fn should_defer(&self, op_class: OpClass, level: PerformanceLevel) -> DeferDecision {
        degradation::should_defer(op_class, level)
    }

    /// Polls until the level is at least `target` or `max_wait` elapses.
    ///
    /// Returns whether the target was reached.
    pub async fn wait_for_level(&self, target: PerformanceLevel, max_wait: Duration) -> bool {
        let deadline = Instant::now() + max_wait;
        loop {
            let level = self.current_level();
            if level.satisfies(target) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                tracing::debug!("Level still {level} after {max_wait:?}, wanted {target}");
                return false;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}
