//! Liveness probes for the governor's own components.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::degradation::DegradationController;
use super::early_warning::EarlyWarningEngine;
use super::sampler::ResourceSampler;
use super::subprocess::{CommandSpec, SubprocessRunner};
use super::task::ManagedTask;
use super::timeout::run_with_timeout;
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::policy::degradation::level_for;
use crate::domain::ports::probe::{Probe, ProbeError};
use crate::domain::value_objects::op_class::OpClass;
use crate::domain::value_objects::performance_level::PerformanceLevel;

fn percent_in_range(value: f64) -> bool {
    (0.0..=100.0).contains(&value)
}

/// Takes a live sample and sanity-checks it; restart re-initialises the source.
pub struct SamplerProbe {
    sampler: Arc<ResourceSampler>,
}

impl SamplerProbe {
    #[must_use]
    pub const fn new(sampler: Arc<ResourceSampler>) -> Self {
        Self { sampler }
    }
}

#[async_trait]
impl Probe for SamplerProbe {
    fn name(&self) -> &str {
        "sampler"
    }

    async fn check(&self) -> Result<(), ProbeError> {
        let snapshot = self
            .sampler
            .sample()
            .map_err(|e| ProbeError::Unreachable(e.to_string()))?;
        let readings = [
            snapshot.memory_percent,
            snapshot.cpu_percent,
            snapshot.disk_percent,
        ];
        if readings.iter().all(|v| percent_in_range(*v)) {
            Ok(())
        } else {
            Err(ProbeError::Unreachable(format!(
                "implausible readings: {readings:?}"
            )))
        }
    }

    async fn restart(&self) -> Result<(), ProbeError> {
        self.sampler
            .reset()
            .map_err(|e| ProbeError::RestartFailed(e.to_string()))
    }
}

/// Feeds known loads through the level policy and checks the answers.
pub struct DegradationProbe {
    controller: Arc<DegradationController>,
}

impl DegradationProbe {
    #[must_use]
    pub const fn new(controller: Arc<DegradationController>) -> Self {
        Self { controller }
    }

    fn synthetic(memory: f64) -> Snapshot {
        Snapshot {
            timestamp: Utc::now(),
            memory_percent: memory,
            memory_available_bytes: 0,
            cpu_percent: 0.0,
            disk_percent: 0.0,
            disk_free_bytes: 0,
            matched_process_count: 0,
            matched_process_memory_mb: 0,
        }
    }
}

#[async_trait]
impl Probe for DegradationProbe {
    fn name(&self) -> &str {
        "degradation"
    }

    async fn check(&self) -> Result<(), ProbeError> {
        let calm = level_for(&Self::synthetic(10.0));
        let saturated = level_for(&Self::synthetic(99.0));
        if calm != PerformanceLevel::Optimal || saturated != PerformanceLevel::Emergency {
            return Err(ProbeError::Unreachable(format!(
                "level policy answered {calm} / {saturated}"
            )));
        }
        if !self
            .controller
            .should_defer(OpClass::Bulk, PerformanceLevel::Emergency)
            .defer
        {
            return Err(ProbeError::Unreachable(
                "bulk work not deferred at EMERGENCY".to_string(),
            ));
        }
        let emergency = self.controller.profile(PerformanceLevel::Emergency);
        let optimal = self.controller.profile(PerformanceLevel::Optimal);
        if emergency.batch_size > optimal.batch_size {
            return Err(ProbeError::Unreachable(
                "EMERGENCY profile is looser than OPTIMAL".to_string(),
            ));
        }
        Ok(())
    }
}

/// Checks that the early warning loop is running and its heartbeat is fresh.
pub struct WarningEngineProbe {
    engine: Arc<EarlyWarningEngine>,
    task: Arc<ManagedTask>,
    /// Heartbeats older than this count as a hung loop
    stale_after: Duration,
}

impl WarningEngineProbe {
    /// Staleness defaults to three engine intervals.
    #[must_use]
    pub fn new(engine: Arc<EarlyWarningEngine>, task: Arc<ManagedTask>) -> Self {
        let stale_after = engine.interval().saturating_mul(3);
        Self {
            engine,
            task,
            stale_after,
        }
    }
}

#[async_trait]
impl Probe for WarningEngineProbe {
    fn name(&self) -> &str {
        "early_warning"
    }

    async fn check(&self) -> Result<(), ProbeError> {
        if !self.task.is_running() {
            return Err(ProbeError::Unreachable("task not running".to_string()));
        }
        // No heartbeat yet just means the first cycle has not finished.
        let Some(heartbeat) = self.engine.last_heartbeat() else {
            return Ok(());
        };
        let age = (Utc::now() - heartbeat).to_std().unwrap_or_default();
        if age > self.stale_after {
            return Err(ProbeError::Unreachable(format!(
                "last heartbeat {}s ago",
                age.as_secs()
            )));
        }
        Ok(())
    }

    async fn restart(&self) -> Result<(), ProbeError> {
        self.task.restart();
        Ok(())
    }
}

/// Exercises the timeout wrapper in both directions.
pub struct TimeoutProbe {
    budget: Duration,
}

impl TimeoutProbe {
    #[must_use]
    pub const fn new(budget: Duration) -> Self {
        Self { budget }
    }
}

impl Default for TimeoutProbe {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

#[async_trait]
impl Probe for TimeoutProbe {
    fn name(&self) -> &str {
        "timeout"
    }

    async fn check(&self) -> Result<(), ProbeError> {
        let quick = run_with_timeout("probe-quick", self.budget, async { Ok::<_, ()>(()) }).await;
        if quick.is_err() {
            return Err(ProbeError::Unreachable(
                "ready operation reported a timeout".to_string(),
            ));
        }
        let stuck = run_with_timeout(
            "probe-stuck",
            self.budget,
            std::future::pending::<Result<(), ()>>(),
        )
        .await;
        match stuck {
            Err(e) if e.is_timeout() => Ok(()),
            _ => Err(ProbeError::Unreachable(
                "pending operation was not timed out".to_string(),
            )),
        }
    }
}

/// Runs a configured shell command; any non-zero exit marks it unhealthy.
pub struct ShellProbe {
    name: String,
    runner: Arc<SubprocessRunner>,
    command: CommandSpec,
    timeout: Duration,
}

impl ShellProbe {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        runner: Arc<SubprocessRunner>,
        script: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            runner,
            command: CommandSpec::shell(script),
            timeout,
        }
    }
}

#[async_trait]
impl Probe for ShellProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> Result<(), ProbeError> {
        let outcome = self
            .runner
            .run(&self.command, self.timeout)
            .await
            .map_err(|e| ProbeError::Unreachable(e.to_string()))?;
        if outcome.timed_out {
            return Err(ProbeError::TimedOut);
        }
        if outcome.success() {
            Ok(())
        } else {
            Err(ProbeError::Unreachable(format!(
                "'{}' exited with {:?}: {}",
                self.command,
                outcome.exit_code,
                outcome.stderr.trim()
            )))
        }
    }
}
