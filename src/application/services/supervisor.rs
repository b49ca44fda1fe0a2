use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::alerts::AlertRegistry;
use super::sampler::ResourceSampler;
use crate::domain::entities::alert::{kind, Alert};
use crate::domain::entities::component::ComponentStatus;
use crate::domain::entities::status::{StatusReport, SystemLoad};
use crate::domain::policy::degradation::level_for;
use crate::domain::policy::health::{reliability_score, system_healthy};
use crate::domain::ports::probe::{Probe, ProbeError};
use crate::domain::ports::publisher::StatusPublisher;
use crate::domain::value_objects::severity::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSettings {
    pub interval: Duration,
    /// Consecutive failures that trigger a restart attempt
    pub failure_threshold: u32,
    /// Restart attempts before a component is escalated for good
    pub restart_attempts_max: u32,
    pub history_capacity: usize,
    pub probe_timeout: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            failure_threshold: 3,
            restart_attempts_max: 3,
            history_capacity: 100,
            probe_timeout: Duration::from_secs(10),
        }
    }
}

/// What a failed probe leads to this cycle.
enum Recovery {
    Wait,
    Restart(u32),
    Escalate(u32),
}

/// Periodically probes components, restarts the failing ones a bounded number
/// of times and publishes a status document.
pub struct HealthSupervisor {
    sampler: Arc<ResourceSampler>,
    registry: Arc<AlertRegistry>,
    publisher: Arc<dyn StatusPublisher>,
    settings: SupervisorSettings,
    probes: Mutex<Vec<Arc<dyn Probe>>>,
    components: Mutex<BTreeMap<String, ComponentStatus>>,
    history: Mutex<VecDeque<StatusReport>>,
}

impl HealthSupervisor {
    #[must_use]
    pub fn new(
        sampler: Arc<ResourceSampler>,
        registry: Arc<AlertRegistry>,
        publisher: Arc<dyn StatusPublisher>,
        settings: SupervisorSettings,
    ) -> Self {
        Self {
            sampler,
            registry,
            publisher,
            settings,
            probes: Mutex::new(Vec::new()),
            components: Mutex::new(BTreeMap::new()),
            history: Mutex::new(VecDeque::new()),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    /// Adds a probe. A second probe with the same name replaces the first.
    pub fn register_probe(&self, probe: Arc<dyn Probe>) {
        let name = probe.name().to_string();
        {
            let mut probes = self.probes.lock().unwrap_or_else(PoisonError::into_inner);
            probes.retain(|p| p.name() != name);
            probes.push(probe);
        }
        self.components
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), ComponentStatus::new(name));
    }

    #[must_use]
    pub fn components(&self) -> Vec<ComponentStatus> {
        self.components
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn latest_status(&self) -> Option<StatusReport> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .cloned()
    }

    /// Published reports, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<StatusReport> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Probes every component once, applies restarts and escalations, then
    /// publishes and records the resulting status.
    pub async fn run_cycle(&self) -> StatusReport {
        let probes = self
            .probes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for probe in probes {
            let result = match tokio::time::timeout(self.settings.probe_timeout, probe.check()).await
            {
                Ok(result) => result,
                Err(_) => Err(ProbeError::TimedOut),
            };
            match self.record(probe.name(), result) {
                Recovery::Wait => {}
                Recovery::Restart(attempt) => self.restart(probe.as_ref(), attempt).await,
                Recovery::Escalate(attempts) => self.escalate(probe.name(), attempts),
            }
        }

        let report = self.build_report();
        if let Err(e) = self.publisher.publish(&report) {
            tracing::warn!("Failed to publish status: {e}");
        }
        {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            if history.len() >= self.settings.history_capacity.max(1) {
                history.pop_front();
            }
            history.push_back(report.clone());
        }
        report
    }

    fn record(&self, name: &str, result: Result<(), ProbeError>) -> Recovery {
        let mut components = self.components.lock().unwrap_or_else(PoisonError::into_inner);
        let status = components
            .entry(name.to_string())
            .or_insert_with(|| ComponentStatus::new(name));
        status.last_check_time = Some(Utc::now());

        match result {
            Ok(()) => {
                if status.consecutive_failures > 0 {
                    tracing::info!("Component '{name}' recovered");
                }
                status.active = true;
                status.consecutive_failures = 0;
                status.last_error = None;
                if !status.escalated {
                    status.restart_attempts = 0;
                }
                Recovery::Wait
            }
            Err(e) => {
                status.active = false;
                status.consecutive_failures += 1;
                status.last_error = Some(e.to_string());
                tracing::warn!(
                    "Component '{name}' failed check ({} in a row): {e}",
                    status.consecutive_failures
                );
                if status.escalated || status.consecutive_failures < self.settings.failure_threshold
                {
                    Recovery::Wait
                } else if status.restart_attempts < self.settings.restart_attempts_max {
                    status.restart_attempts += 1;
                    status.consecutive_failures = 0;
                    Recovery::Restart(status.restart_attempts)
                } else {
                    status.escalated = true;
                    Recovery::Escalate(status.restart_attempts)
                }
            }
        }
    }

    async fn restart(&self, probe: &dyn Probe, attempt: u32) {
        let name = probe.name();
        tracing::info!(
            "Restarting '{name}' (attempt {attempt}/{})",
            self.settings.restart_attempts_max
        );
        if let Err(e) = probe.restart().await {
            tracing::warn!("Restart of '{name}' failed: {e}");
            if let Some(status) = self
                .components
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get_mut(name)
            {
                status.last_error = Some(e.to_string());
            }
        }
    }

    fn escalate(&self, name: &str, attempts: u32) {
        let last_error = self
            .components
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .and_then(|s| s.last_error.clone());
        tracing::error!("Component '{name}' still failing after {attempts} restart(s), giving up");
        self.registry.raise(Alert::new(
            Severity::Critical,
            kind::COMPONENT_UNREACHABLE,
            format!("Component '{name}' unreachable after {attempts} restart attempt(s)"),
            json!({
                "component": name,
                "restart_attempts": attempts,
                "last_error": last_error,
            }),
        ));
    }

    fn build_report(&self) -> StatusReport {
        let components: BTreeMap<String, bool> = self
            .components
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, status)| (name.clone(), status.active))
            .collect();
        let active = components.values().filter(|active| **active).count();

        let (system_load, healthy) = match self.sampler.sample() {
            Ok(snapshot) => (
                Some(SystemLoad::new(&snapshot, level_for(&snapshot))),
                system_healthy(&snapshot),
            ),
            Err(e) => {
                tracing::warn!("Health cycle without metrics: {e}");
                (None, false)
            }
        };

        let now = Utc::now();
        StatusReport {
            timestamp: now,
            reliability_score: reliability_score(active, components.len(), healthy),
            components,
            system_load,
            active_alert_count: self.registry.active_count(),
            last_health_check: now,
        }
    }

    /// Runs `run_cycle` on the configured interval until `token` is cancelled.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        tracing::info!(
            "Health supervisor started (interval: {:?})",
            self.settings.interval
        );
        let mut interval = tokio::time::interval(self.settings.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = tokio::select! {
                        report = self.run_cycle() => report,
                        () = token.cancelled() => break,
                    };
                    tracing::debug!(
                        "Health cycle: {}/{} components active, score {:.2}",
                        report.active_components(),
                        report.components.len(),
                        report.reliability_score
                    );
                }
                () = token.cancelled() => break,
            }
        }
        tracing::info!("Health supervisor stopped");
    }
}
