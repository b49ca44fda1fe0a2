use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::application::services::adaptive::AdaptiveSettings;
use crate::application::services::early_warning::EarlyWarningSettings;
use crate::application::services::scheduler::SchedulerSettings;
use crate::application::services::supervisor::SupervisorSettings;
use crate::domain::value_objects::operation_profile::ProfileTable;
use crate::domain::value_objects::performance_level::PerformanceLevel;
use crate::domain::value_objects::thresholds::ThresholdSet;
use crate::domain::value_objects::trend_settings::TrendSettings;

/// Rejected configuration values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name}: warning ({warning}) must be below critical ({critical})")]
    InvertedThresholds {
        name: &'static str,
        warning: f64,
        critical: f64,
    },
    #[error("{name} must be within 0..=100, got {value}")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("pause_by_level.{level} is not a valid duration: {value}")]
    InvalidPause { level: PerformanceLevel, value: f64 },
}

/// Top-level application configuration loaded from TOML.
///
/// Scalar thresholds sit at the top level; tuning for each service lives in
/// its own table. Unknown keys are rejected everywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "default_memory_warning")]
    pub memory_warning: f64,
    #[serde(default = "default_memory_critical")]
    pub memory_critical: f64,
    #[serde(default = "default_cpu_warning")]
    pub cpu_warning: f64,
    #[serde(default = "default_cpu_critical")]
    pub cpu_critical: f64,
    #[serde(default = "default_disk_warning")]
    pub disk_warning: f64,
    #[serde(default = "default_disk_critical")]
    pub disk_critical: f64,
    #[serde(default = "default_max_processes")]
    pub max_processes: usize,
    #[serde(default = "default_process_memory_mb")]
    pub process_memory_mb: u64,
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    #[serde(default = "default_restart_attempts_max")]
    pub restart_attempts_max: u32,
    /// Substrings matched against process names to count worker processes
    #[serde(default = "default_process_patterns")]
    pub process_patterns: Vec<String>,
    #[serde(default)]
    pub batch_size_by_level: BatchSizeByLevel,
    #[serde(default)]
    pub pause_by_level: PauseByLevel,
    #[serde(default)]
    pub early_warning: EarlyWarningConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Batch size per performance level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchSizeByLevel {
    #[serde(default = "default_batch_optimal")]
    pub optimal: usize,
    #[serde(default = "default_batch_reduced")]
    pub reduced: usize,
    #[serde(default = "default_batch_minimal")]
    pub minimal: usize,
    #[serde(default = "default_batch_emergency")]
    pub emergency: usize,
}

/// Pause between batches per performance level, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PauseByLevel {
    #[serde(default = "default_pause_optimal")]
    pub optimal: f64,
    #[serde(default = "default_pause_reduced")]
    pub reduced: f64,
    #[serde(default = "default_pause_minimal")]
    pub minimal: f64,
    #[serde(default = "default_pause_emergency")]
    pub emergency: f64,
}

/// Rolling window and trend analyzer tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EarlyWarningConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_alert_history")]
    pub history_capacity: usize,
    #[serde(default = "default_memory_rate")]
    pub memory_rate_per_minute: f64,
    #[serde(default = "default_projection_target")]
    pub projection_target_percent: f64,
    #[serde(default = "default_emergency_minutes")]
    pub emergency_minutes: f64,
    #[serde(default = "default_critical_minutes")]
    pub critical_minutes: f64,
    #[serde(default = "default_cpu_sustained_percent")]
    pub cpu_sustained_percent: f64,
    #[serde(default = "default_cpu_sustained_samples")]
    pub cpu_sustained_samples: usize,
    #[serde(default = "default_process_growth_min")]
    pub process_growth_min: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    #[serde(default = "default_inter_item_delay_ms")]
    pub inter_item_delay_ms: u64,
    /// Items between in-batch memory checks
    #[serde(default = "default_cooldown_every")]
    pub cooldown_every: usize,
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,
    #[serde(default = "default_admission_wait")]
    pub admission_wait_seconds: u64,
    #[serde(default = "default_level_poll")]
    pub level_poll_seconds: u64,
    #[serde(default = "default_item_timeout")]
    pub item_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    #[serde(default = "default_grace")]
    pub subprocess_grace_seconds: u64,
    #[serde(default = "default_output_limit")]
    pub output_limit_bytes: usize,
    #[serde(default = "default_adaptive_min")]
    pub adaptive_min_seconds: u64,
    #[serde(default = "default_adaptive_max")]
    pub adaptive_max_seconds: u64,
    #[serde(default = "default_adaptive_default")]
    pub adaptive_default_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupervisorConfig {
    /// Consecutive failures before a restart is attempted
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_status_history")]
    pub history_capacity: usize,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,
    /// Shell command probed as the external batch-shell component
    #[serde(default = "default_shell_probe_command")]
    pub shell_probe_command: String,
}

/// Output locations (tilde-expanded at point of use).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    #[serde(default = "default_status_file")]
    pub status_file: String,
    #[serde(default = "default_alert_log")]
    pub alert_log: String,
}

// --- Defaults ---

const fn default_memory_warning() -> f64 {
    80.0
}

const fn default_memory_critical() -> f64 {
    90.0
}

const fn default_cpu_warning() -> f64 {
    75.0
}

const fn default_cpu_critical() -> f64 {
    90.0
}

const fn default_disk_warning() -> f64 {
    85.0
}

const fn default_disk_critical() -> f64 {
    95.0
}

const fn default_max_processes() -> usize {
    5
}

const fn default_process_memory_mb() -> u64 {
    500
}

const fn default_check_interval() -> u64 {
    30
}

const fn default_restart_attempts_max() -> u32 {
    3
}

fn default_process_patterns() -> Vec<String> {
    vec!["claude".into()]
}

const fn default_batch_optimal() -> usize {
    50
}

const fn default_batch_reduced() -> usize {
    20
}

const fn default_batch_minimal() -> usize {
    5
}

const fn default_batch_emergency() -> usize {
    1
}

const fn default_pause_optimal() -> f64 {
    0.5
}

const fn default_pause_reduced() -> f64 {
    2.0
}

const fn default_pause_minimal() -> f64 {
    5.0
}

const fn default_pause_emergency() -> f64 {
    15.0
}

const fn default_window_size() -> usize {
    60
}

const fn default_alert_history() -> usize {
    1000
}

const fn default_memory_rate() -> f64 {
    2.0
}

const fn default_projection_target() -> f64 {
    90.0
}

const fn default_emergency_minutes() -> f64 {
    5.0
}

const fn default_critical_minutes() -> f64 {
    15.0
}

const fn default_cpu_sustained_percent() -> f64 {
    85.0
}

const fn default_cpu_sustained_samples() -> usize {
    10
}

const fn default_process_growth_min() -> usize {
    2
}

const fn default_inter_item_delay_ms() -> u64 {
    100
}

const fn default_cooldown_every() -> usize {
    5
}

const fn default_cooldown_seconds() -> u64 {
    10
}

const fn default_admission_wait() -> u64 {
    60
}

const fn default_level_poll() -> u64 {
    5
}

const fn default_item_timeout() -> u64 {
    300
}

const fn default_grace() -> u64 {
    5
}

const fn default_output_limit() -> usize {
    1024 * 1024
}

const fn default_adaptive_min() -> u64 {
    1
}

const fn default_adaptive_max() -> u64 {
    600
}

const fn default_adaptive_default() -> u64 {
    60
}

const fn default_failure_threshold() -> u32 {
    3
}

const fn default_status_history() -> usize {
    100
}

const fn default_probe_timeout() -> u64 {
    10
}

fn default_shell_probe_command() -> String {
    "exit 0".into()
}

// NOTE: Stored as raw strings with tilde; expand with shellexpand at point of use.
fn default_status_file() -> String {
    "~/.local/share/warden/status.json".into()
}

fn default_alert_log() -> String {
    "~/.local/share/warden/alerts.jsonl".into()
}

// --- Default impls ---

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            memory_warning: default_memory_warning(),
            memory_critical: default_memory_critical(),
            cpu_warning: default_cpu_warning(),
            cpu_critical: default_cpu_critical(),
            disk_warning: default_disk_warning(),
            disk_critical: default_disk_critical(),
            max_processes: default_max_processes(),
            process_memory_mb: default_process_memory_mb(),
            check_interval_seconds: default_check_interval(),
            restart_attempts_max: default_restart_attempts_max(),
            process_patterns: default_process_patterns(),
            batch_size_by_level: BatchSizeByLevel::default(),
            pause_by_level: PauseByLevel::default(),
            early_warning: EarlyWarningConfig::default(),
            scheduler: SchedulerConfig::default(),
            timeouts: TimeoutConfig::default(),
            supervisor: SupervisorConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for BatchSizeByLevel {
    fn default() -> Self {
        Self {
            optimal: default_batch_optimal(),
            reduced: default_batch_reduced(),
            minimal: default_batch_minimal(),
            emergency: default_batch_emergency(),
        }
    }
}

impl Default for PauseByLevel {
    fn default() -> Self {
        Self {
            optimal: default_pause_optimal(),
            reduced: default_pause_reduced(),
            minimal: default_pause_minimal(),
            emergency: default_pause_emergency(),
        }
    }
}

impl Default for EarlyWarningConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            history_capacity: default_alert_history(),
            memory_rate_per_minute: default_memory_rate(),
            projection_target_percent: default_projection_target(),
            emergency_minutes: default_emergency_minutes(),
            critical_minutes: default_critical_minutes(),
            cpu_sustained_percent: default_cpu_sustained_percent(),
            cpu_sustained_samples: default_cpu_sustained_samples(),
            process_growth_min: default_process_growth_min(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            inter_item_delay_ms: default_inter_item_delay_ms(),
            cooldown_every: default_cooldown_every(),
            cooldown_seconds: default_cooldown_seconds(),
            admission_wait_seconds: default_admission_wait(),
            level_poll_seconds: default_level_poll(),
            item_timeout_seconds: default_item_timeout(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            subprocess_grace_seconds: default_grace(),
            output_limit_bytes: default_output_limit(),
            adaptive_min_seconds: default_adaptive_min(),
            adaptive_max_seconds: default_adaptive_max(),
            adaptive_default_seconds: default_adaptive_default(),
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            history_capacity: default_status_history(),
            probe_timeout_seconds: default_probe_timeout(),
            shell_probe_command: default_shell_probe_command(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            status_file: default_status_file(),
            alert_log: default_alert_log(),
        }
    }
}

impl BatchSizeByLevel {
    #[must_use]
    pub const fn get(&self, level: PerformanceLevel) -> usize {
        match level {
            PerformanceLevel::Optimal => self.optimal,
            PerformanceLevel::Reduced => self.reduced,
            PerformanceLevel::Minimal => self.minimal,
            PerformanceLevel::Emergency => self.emergency,
        }
    }
}

impl PauseByLevel {
    #[must_use]
    pub const fn get(&self, level: PerformanceLevel) -> f64 {
        match level {
            PerformanceLevel::Optimal => self.optimal,
            PerformanceLevel::Reduced => self.reduced,
            PerformanceLevel::Minimal => self.minimal,
            PerformanceLevel::Emergency => self.emergency,
        }
    }
}

// --- AppConfig methods ---

impl AppConfig {
    /// Load config from default path or create default config file
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined,
    /// the file cannot be read, or the TOML content is invalid.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_or_create(&path)
    }

    /// Load from a specific path, or create a default config file if missing
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is invalid,
    /// or the default config file cannot be written.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Load from a specific path and validate
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is invalid
    /// or contains unknown keys, or a value fails validation.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        Self::parse(&content)
    }

    /// Parse and validate TOML content
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid TOML, contains unknown keys,
    /// or a value fails validation.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config file")?;
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Save config to a specific path, creating parent directories if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created,
    /// serialization fails, or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Default location: `<config dir>/warden/config.toml`
    ///
    /// # Errors
    ///
    /// Returns an error if the platform config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("warden").join("config.toml"))
    }

    /// Checks ranges and warning/critical ordering.
    ///
    /// # Errors
    ///
    /// Returns the first rejected value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, warning, critical) in [
            ("memory", self.memory_warning, self.memory_critical),
            ("cpu", self.cpu_warning, self.cpu_critical),
            ("disk", self.disk_warning, self.disk_critical),
        ] {
            for value in [warning, critical] {
                if !(0.0..=100.0).contains(&value) {
                    return Err(ConfigError::OutOfRange { name, value });
                }
            }
            if warning >= critical {
                return Err(ConfigError::InvertedThresholds {
                    name,
                    warning,
                    critical,
                });
            }
        }

        let nonzero = [
            ("check_interval_seconds", self.check_interval_seconds == 0),
            ("early_warning.window_size", self.early_warning.window_size == 0),
            ("scheduler.item_timeout_seconds", self.scheduler.item_timeout_seconds == 0),
            ("scheduler.level_poll_seconds", self.scheduler.level_poll_seconds == 0),
            ("supervisor.failure_threshold", self.supervisor.failure_threshold == 0),
            ("supervisor.probe_timeout_seconds", self.supervisor.probe_timeout_seconds == 0),
        ];
        if let Some((name, _)) = nonzero.into_iter().find(|(_, zero)| *zero) {
            return Err(ConfigError::Zero(name));
        }

        for level in PerformanceLevel::ALL {
            if self.batch_size_by_level.get(level) == 0 {
                return Err(ConfigError::Zero("batch_size_by_level"));
            }
            let value = self.pause_by_level.get(level);
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(ConfigError::InvalidPause { level, value });
            }
        }
        Ok(())
    }

    #[must_use]
    pub const fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    #[must_use]
    pub const fn level_poll_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.level_poll_seconds)
    }

    #[must_use]
    pub const fn subprocess_grace(&self) -> Duration {
        Duration::from_secs(self.timeouts.subprocess_grace_seconds)
    }

    #[must_use]
    pub fn status_file_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.paths.status_file).as_ref())
    }

    #[must_use]
    pub fn alert_log_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.paths.alert_log).as_ref())
    }
}

impl From<&AppConfig> for ThresholdSet {
    fn from(config: &AppConfig) -> Self {
        Self {
            memory_warning: config.memory_warning,
            memory_critical: config.memory_critical,
            cpu_warning: config.cpu_warning,
            cpu_critical: config.cpu_critical,
            disk_warning: config.disk_warning,
            disk_critical: config.disk_critical,
            max_processes: config.max_processes,
            process_memory_mb: config.process_memory_mb,
            ..Self::default()
        }
    }
}

impl From<&AppConfig> for ProfileTable {
    fn from(config: &AppConfig) -> Self {
        let mut table = Self::default();
        for level in PerformanceLevel::ALL {
            let profile = table.get_mut(level);
            profile.batch_size = config.batch_size_by_level.get(level).max(1);
            if let Ok(pause) = Duration::try_from_secs_f64(config.pause_by_level.get(level)) {
                profile.pause_between_batches = pause;
            }
        }
        table
    }
}

impl From<&AppConfig> for TrendSettings {
    fn from(config: &AppConfig) -> Self {
        let ew = &config.early_warning;
        Self {
            memory_rate_per_minute: ew.memory_rate_per_minute,
            projection_target_percent: ew.projection_target_percent,
            emergency_minutes: ew.emergency_minutes,
            critical_minutes: ew.critical_minutes,
            cpu_sustained_percent: ew.cpu_sustained_percent,
            cpu_sustained_samples: ew.cpu_sustained_samples.max(1),
            process_growth_min: ew.process_growth_min,
            ..Self::default()
        }
    }
}

impl From<&AppConfig> for EarlyWarningSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            window_size: config.early_warning.window_size,
            history_capacity: config.early_warning.history_capacity,
            interval: config.check_interval(),
            trend: TrendSettings::from(config),
        }
    }
}

impl From<&AppConfig> for SchedulerSettings {
    fn from(config: &AppConfig) -> Self {
        let s = &config.scheduler;
        Self {
            inter_item_delay: Duration::from_millis(s.inter_item_delay_ms),
            cooldown_every: s.cooldown_every,
            cooldown: Duration::from_secs(s.cooldown_seconds),
            admission_wait: Duration::from_secs(s.admission_wait_seconds),
            item_timeout: Duration::from_secs(s.item_timeout_seconds),
        }
    }
}

impl From<&AppConfig> for AdaptiveSettings {
    fn from(config: &AppConfig) -> Self {
        let t = &config.timeouts;
        let min = Duration::from_secs(t.adaptive_min_seconds);
        Self {
            min,
            max: Duration::from_secs(t.adaptive_max_seconds).max(min),
            default: Duration::from_secs(t.adaptive_default_seconds),
            ..Self::default()
        }
    }
}

impl From<&AppConfig> for SupervisorSettings {
    fn from(config: &AppConfig) -> Self {
        let s = &config.supervisor;
        Self {
            interval: config.check_interval(),
            failure_threshold: s.failure_threshold,
            restart_attempts_max: config.restart_attempts_max,
            history_capacity: s.history_capacity,
            probe_timeout: Duration::from_secs(s.probe_timeout_seconds),
        }
    }
}
