use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::adaptive::{AdaptiveSettings, AdaptiveTimeouts};
use super::alerts::AlertRegistry;
use super::degradation::DegradationController;
use super::early_warning::{EarlyWarningEngine, EarlyWarningSettings};
use super::probes::{DegradationProbe, SamplerProbe, ShellProbe, TimeoutProbe, WarningEngineProbe};
use super::sampler::ResourceSampler;
use super::scheduler::{BatchScheduler, SchedulerSettings};
use super::subprocess::{CommandSpec, SubprocessError, SubprocessOutcome, SubprocessRunner};
use super::supervisor::{HealthSupervisor, SupervisorSettings};
use super::task::ManagedTask;
use super::timeout::{self, IterativeLimits, IterativeReport, TimeoutError};
use crate::application::config::AppConfig;
use crate::domain::entities::alert::Alert;
use crate::domain::entities::batch::BatchReport;
use crate::domain::entities::status::StatusReport;
use crate::domain::policy::admission::AdmissionDecision;
use crate::domain::policy::degradation::{DeferDecision, OperationParameters};
use crate::domain::ports::alert_log::AlertLog;
use crate::domain::ports::collector::{CollectionError, MetricsSource};
use crate::domain::ports::process_manager::ProcessManager;
use crate::domain::ports::publisher::StatusPublisher;
use crate::domain::rules::TrendAnalyzers;
use crate::domain::value_objects::op_class::OpClass;
use crate::domain::value_objects::operation_profile::{OperationProfile, ProfileTable};
use crate::domain::value_objects::performance_level::PerformanceLevel;
use crate::domain::value_objects::thresholds::ThresholdSet;

/// Adapters the governor needs from the outside world.
pub struct GovernorPorts {
    pub metrics: Arc<dyn MetricsSource>,
    pub processes: Arc<dyn ProcessManager>,
    pub publisher: Arc<dyn StatusPublisher>,
    pub alert_log: Arc<dyn AlertLog>,
}

/// Single entry point tying sampler, level controller, scheduler, timeouts,
/// early warnings and supervision together.
pub struct Governor {
    sampler: Arc<ResourceSampler>,
    degradation: Arc<DegradationController>,
    registry: Arc<AlertRegistry>,
    engine: Arc<EarlyWarningEngine>,
    scheduler: BatchScheduler,
    runner: Arc<SubprocessRunner>,
    adaptive: AdaptiveTimeouts,
    supervisor: Arc<HealthSupervisor>,
    shutdown: CancellationToken,
    engine_task: Arc<ManagedTask>,
    supervisor_task: ManagedTask,
}

impl Governor {
    /// Wires every component from `config` and registers the built-in probes.
    /// Background loops do not run until `start`.
    #[must_use]
    pub fn new(ports: GovernorPorts, config: &AppConfig) -> Self {
        let sampler = Arc::new(ResourceSampler::new(
            ports.metrics,
            ThresholdSet::from(config),
        ));
        let degradation = Arc::new(DegradationController::new(
            sampler.clone(),
            ProfileTable::from(config),
            config.level_poll_interval(),
        ));
        let early_warning = EarlyWarningSettings::from(config);
        let registry = Arc::new(AlertRegistry::new(
            ports.alert_log,
            early_warning.history_capacity,
        ));
        let engine = Arc::new(EarlyWarningEngine::new(
            sampler.clone(),
            TrendAnalyzers::default(),
            registry.clone(),
            early_warning,
        ));
        let scheduler = BatchScheduler::new(
            sampler.clone(),
            degradation.clone(),
            SchedulerSettings::from(config),
        );
        let runner = Arc::new(SubprocessRunner::new(
            ports.processes,
            config.subprocess_grace(),
            config.timeouts.output_limit_bytes,
        ));
        let supervisor_settings = SupervisorSettings::from(config);
        let supervisor = Arc::new(HealthSupervisor::new(
            sampler.clone(),
            registry.clone(),
            ports.publisher,
            supervisor_settings,
        ));

        let shutdown = CancellationToken::new();
        let engine_loop = engine.clone();
        let engine_task = Arc::new(ManagedTask::new(
            "early_warning",
            shutdown.clone(),
            move |token| engine_loop.clone().run(token),
        ));
        let supervisor_loop = supervisor.clone();
        let supervisor_task = ManagedTask::new("supervisor", shutdown.clone(), move |token| {
            supervisor_loop.clone().run(token)
        });

        supervisor.register_probe(Arc::new(SamplerProbe::new(sampler.clone())));
        supervisor.register_probe(Arc::new(DegradationProbe::new(degradation.clone())));
        supervisor.register_probe(Arc::new(WarningEngineProbe::new(
            engine.clone(),
            engine_task.clone(),
        )));
        supervisor.register_probe(Arc::new(TimeoutProbe::default()));
        let shell_command = config.supervisor.shell_probe_command.trim();
        if !shell_command.is_empty() {
            supervisor.register_probe(Arc::new(ShellProbe::new(
                "batch_shell",
                runner.clone(),
                shell_command,
                supervisor_settings.probe_timeout,
            )));
        }

        Self {
            sampler,
            degradation,
            registry,
            engine,
            scheduler,
            runner,
            adaptive: AdaptiveTimeouts::new(AdaptiveSettings::from(config)),
            supervisor,
            shutdown,
            engine_task,
            supervisor_task,
        }
    }

    /// Starts the early warning and supervisor loops.
    pub fn start(&self) {
        tracing::info!("Starting governor background tasks");
        self.engine_task.start();
        self.supervisor_task.start();
    }

    /// Cancels both loops and waits up to `timeout` for each.
    pub async fn shutdown(&self, timeout: Duration) {
        tracing::info!("Shutting down governor");
        self.shutdown.cancel();
        let (engine, supervisor) = tokio::join!(
            self.engine_task.shutdown(timeout),
            self.supervisor_task.shutdown(timeout)
        );
        if !(engine && supervisor) {
            tracing::warn!("Background tasks had to be aborted");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.engine_task.is_running() && self.supervisor_task.is_running()
    }

    // --- Admission and degradation ---

    #[must_use]
    pub fn admit(&self, op_class: OpClass) -> AdmissionDecision {
        self.sampler.admit(op_class)
    }

    #[must_use]
    pub fn current_level(&self) -> PerformanceLevel {
        self.degradation.current_level()
    }

    #[must_use]
    pub fn profile(&self, level: PerformanceLevel) -> &OperationProfile {
        self.degradation.profile(level)
    }

    /// Tightens `requested` to the profile of the current level.
    #[must_use]
    pub fn adapt_parameters(&self, requested: &OperationParameters) -> OperationParameters {
        self.degradation
            .adapt_parameters(requested, self.current_level())
    }

    #[must_use]
    pub fn should_defer(&self, op_class: OpClass) -> DeferDecision {
        self.degradation
            .should_defer(op_class, self.current_level())
    }

    /// Blocks until the level satisfies `target` or `max_wait` passes.
    pub async fn wait_for_level(&self, target: PerformanceLevel, max_wait: Duration) -> bool {
        self.degradation.wait_for_level(target, max_wait).await
    }

    // --- Execution ---

    /// See `BatchScheduler::run_batch`.
    pub async fn run_batch<I, T, E, F, Fut>(
        &self,
        items: Vec<I>,
        op_class: OpClass,
        requested_batch_size: Option<usize>,
        f: F,
        token: &CancellationToken,
    ) -> BatchReport<T>
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.scheduler
            .run_batch(items, op_class, requested_batch_size, f, token)
            .await
    }

    /// # Errors
    ///
    /// Returns `TimeoutError::Exceeded` on timeout, or the operation's own error.
    pub async fn run_with_timeout<T, E, F>(
        &self,
        operation: &str,
        duration: Duration,
        fut: F,
    ) -> Result<T, TimeoutError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        timeout::run_with_timeout(operation, duration, fut).await
    }

    /// Like `run_with_timeout`, with a deadline learned from past runs of
    /// `operation`.
    ///
    /// # Errors
    ///
    /// Returns `TimeoutError::Exceeded` on timeout, or the operation's own error.
    pub async fn run_adaptive<T, E, F>(&self, operation: &str, fut: F) -> Result<T, TimeoutError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        self.adaptive.run(operation, fut).await
    }

    #[must_use]
    pub fn adaptive_timeout(&self, operation: &str) -> Duration {
        self.adaptive.timeout_for(operation)
    }

    pub async fn run_iterative<I, T, E, F, Fut>(
        &self,
        operation: &str,
        items: Vec<I>,
        limits: IterativeLimits,
        f: F,
    ) -> IterativeReport<T>
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        timeout::run_iterative(operation, items, limits, f).await
    }

    /// # Errors
    ///
    /// Returns `SubprocessError` if the command cannot be spawned or reaped.
    pub async fn run_subprocess_with_timeout(
        &self,
        command: &CommandSpec,
        timeout: Duration,
    ) -> Result<SubprocessOutcome, SubprocessError> {
        self.runner.run(command, timeout).await
    }

    // --- Alerts and status ---

    pub fn register_alert_callback<F>(&self, callback: F)
    where
        F: Fn(&Alert) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.registry.register_callback(callback);
    }

    /// Runs one early warning pass outside the background loop.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` if the host could not be sampled.
    pub fn check_early_warnings(&self) -> Result<Vec<Alert>, CollectionError> {
        self.engine.check()
    }

    #[must_use]
    pub fn active_alerts(&self) -> Vec<Alert> {
        self.registry.active_alerts()
    }

    #[must_use]
    pub fn alert_history(&self, limit: usize) -> Vec<Alert> {
        self.registry.history(limit)
    }

    pub fn clear_alert(&self, id: &str) -> bool {
        self.registry.clear_alert(id)
    }

    pub fn clear_all_alerts(&self) -> usize {
        self.registry.clear_all()
    }

    /// Latest published status, or a fresh health cycle if none ran yet.
    pub async fn get_status(&self) -> StatusReport {
        match self.supervisor.latest_status() {
            Some(report) => report,
            None => self.supervisor.run_cycle().await,
        }
    }

    #[must_use]
    pub fn status_history(&self) -> Vec<StatusReport> {
        self.supervisor.history()
    }

    #[must_use]
    pub fn supervisor(&self) -> &Arc<HealthSupervisor> {
        &self.supervisor
    }
}
