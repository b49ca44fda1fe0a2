use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time reading of host resource pressure.
///
/// Produced fresh on every sample and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub memory_percent: f64,
    pub memory_available_bytes: u64,
    pub cpu_percent: f64,
    pub disk_percent: f64,
    pub disk_free_bytes: u64,
    /// Number of running processes matching the configured worker patterns
    pub matched_process_count: usize,
    /// Largest resident size among matched processes, in MB
    #[serde(default)]
    pub matched_process_memory_mb: u64,
}
