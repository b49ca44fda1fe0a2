use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::snapshot::Snapshot;
use crate::domain::value_objects::performance_level::PerformanceLevel;

/// Host load as seen by the last supervisor cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemLoad {
    pub memory_percent: f64,
    pub cpu_percent: f64,
    pub disk_percent: f64,
    pub matched_process_count: usize,
    pub level: PerformanceLevel,
}

impl SystemLoad {
    #[must_use]
    pub const fn new(snapshot: &Snapshot, level: PerformanceLevel) -> Self {
        Self {
            memory_percent: snapshot.memory_percent,
            cpu_percent: snapshot.cpu_percent,
            disk_percent: snapshot.disk_percent,
            matched_process_count: snapshot.matched_process_count,
            level,
        }
    }
}

/// Status document published after every supervisor cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub timestamp: DateTime<Utc>,
    /// Component name to liveness
    pub components: BTreeMap<String, bool>,
    /// `None` when host metrics could not be read this cycle
    pub system_load: Option<SystemLoad>,
    pub reliability_score: f64,
    pub active_alert_count: usize,
    pub last_health_check: DateTime<Utc>,
}

impl StatusReport {
    #[must_use]
    pub fn active_components(&self) -> usize {
        self.components.values().filter(|active| **active).count()
    }
}
