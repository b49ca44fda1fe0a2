use serde::{Deserialize, Serialize};

/// Set of single-sample thresholds for host resource pressure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    /// Memory usage percentage that triggers a warning
    pub memory_warning: f64,
    /// Memory usage percentage that triggers a critical alert
    pub memory_critical: f64,
    /// CPU usage percentage that triggers a warning
    pub cpu_warning: f64,
    /// CPU usage percentage that triggers a critical alert
    pub cpu_critical: f64,
    /// Disk usage percentage that triggers a warning
    pub disk_warning: f64,
    /// Disk usage percentage that triggers a critical alert
    pub disk_critical: f64,
    /// Maximum number of matched worker processes
    pub max_processes: usize,
    /// Resident memory ceiling for a single matched process, in MB
    pub process_memory_mb: u64,
    /// Memory percentage above which `bulk` operations are refused
    pub bulk_memory_limit: f64,
    /// Matched process count above which `bulk` operations are refused
    pub bulk_max_processes: usize,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            memory_warning: 80.0,
            memory_critical: 90.0,
            cpu_warning: 75.0,
            cpu_critical: 90.0,
            disk_warning: 85.0,
            disk_critical: 95.0,
            max_processes: 5,
            process_memory_mb: 500,
            bulk_memory_limit: 85.0,
            bulk_max_processes: 3,
        }
    }
}
