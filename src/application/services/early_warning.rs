use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use super::alerts::AlertRegistry;
use super::sampler::ResourceSampler;
use crate::domain::entities::alert::Alert;
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::entities::window::SnapshotWindow;
use crate::domain::ports::collector::CollectionError;
use crate::domain::rules::TrendAnalyzers;
use crate::domain::value_objects::trend_settings::TrendSettings;

#[derive(Debug, Clone, PartialEq)]
pub struct EarlyWarningSettings {
    pub window_size: usize,
    pub history_capacity: usize,
    pub interval: Duration,
    pub trend: TrendSettings,
}

impl Default for EarlyWarningSettings {
    fn default() -> Self {
        Self {
            window_size: 60,
            history_capacity: 1000,
            interval: Duration::from_secs(30),
            trend: TrendSettings::default(),
        }
    }
}

/// Feeds snapshots into a rolling window and raises trend alerts.
pub struct EarlyWarningEngine {
    sampler: Arc<ResourceSampler>,
    analyzers: TrendAnalyzers,
    registry: Arc<AlertRegistry>,
    settings: EarlyWarningSettings,
    window: Mutex<SnapshotWindow>,
    heartbeat: Mutex<Option<DateTime<Utc>>>,
}

impl EarlyWarningEngine {
    #[must_use]
    pub fn new(
        sampler: Arc<ResourceSampler>,
        analyzers: TrendAnalyzers,
        registry: Arc<AlertRegistry>,
        settings: EarlyWarningSettings,
    ) -> Self {
        let window = SnapshotWindow::with_capacity(settings.window_size);
        Self {
            sampler,
            analyzers,
            registry,
            settings,
            window: Mutex::new(window),
            heartbeat: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<AlertRegistry> {
        &self.registry
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.settings.interval
    }

    /// Time of the last completed cycle, successful or not.
    #[must_use]
    pub fn last_heartbeat(&self) -> Option<DateTime<Utc>> {
        *self.heartbeat.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn window_len(&self) -> usize {
        self.window
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Appends `snapshot` to the window, runs every analyzer, and raises the
    /// detections that are not already active. Returns the newly raised alerts.
    pub fn ingest(&self, snapshot: Snapshot) -> Vec<Alert> {
        let detections = {
            let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
            window.push(snapshot);
            self.analyzers
                .analyze(&window, self.sampler.thresholds(), &self.settings.trend)
        };
        detections
            .into_iter()
            .filter(|alert| self.registry.raise(alert.clone()))
            .collect()
    }

    /// Samples once and ingests the result.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` if the host could not be sampled; the window is
    /// left untouched.
    pub fn check(&self) -> Result<Vec<Alert>, CollectionError> {
        let result = self.sampler.sample().map(|snapshot| self.ingest(snapshot));
        *self.heartbeat.lock().unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
        result
    }

    /// Runs `check` on the configured interval until `token` is cancelled.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        tracing::info!(
            "Early warning engine started (interval: {:?})",
            self.settings.interval
        );
        let mut interval = tokio::time::interval(self.settings.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.check() {
                        Ok(raised) if !raised.is_empty() => {
                            tracing::info!("{} new alert(s)", raised.len());
                        }
                        Ok(_) => tracing::debug!("No new alerts"),
                        Err(e) => tracing::warn!("Early warning cycle skipped: {e}"),
                    }
                }
                () = token.cancelled() => {
                    tracing::info!("Early warning engine stopped");
                    break;
                }
            }
        }
    }
}
