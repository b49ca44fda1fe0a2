use std::time::Duration;

use super::performance_level::PerformanceLevel;

/// Concrete limits bound to a performance level
#[derive(Debug, Clone, PartialEq)]
pub struct OperationProfile {
    pub batch_size: usize,
    pub pause_between_batches: Duration,
    pub max_concurrent_ops: usize,
    pub max_file_size_mb: u64,
    pub max_output_lines: usize,
    pub validation_enabled: bool,
    pub verbose_logging: bool,
    /// Memory percentage above which the scheduler inserts an in-batch cooldown
    pub cooldown_memory_percent: f64,
}

/// Lookup table with one fixed profile per level
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileTable {
    pub optimal: OperationProfile,
    pub reduced: OperationProfile,
    pub minimal: OperationProfile,
    pub emergency: OperationProfile,
}

impl ProfileTable {
    #[must_use]
    pub const fn get(&self, level: PerformanceLevel) -> &OperationProfile {
        match level {
            PerformanceLevel::Optimal => &self.optimal,
            PerformanceLevel::Reduced => &self.reduced,
            PerformanceLevel::Minimal => &self.minimal,
            PerformanceLevel::Emergency => &self.emergency,
        }
    }

    pub const fn get_mut(&mut self, level: PerformanceLevel) -> &mut OperationProfile {
        match level {
            PerformanceLevel::Optimal => &mut self.optimal,
            PerformanceLevel::Reduced => &mut self.reduced,
            PerformanceLevel::Minimal => &mut self.minimal,
            PerformanceLevel::Emergency => &mut self.emergency,
        }
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self {
            optimal: OperationProfile {
                batch_size: 50,
                pause_between_batches: Duration::from_millis(500),
                max_concurrent_ops: 4,
                max_file_size_mb: 100,
                max_output_lines: 10_000,
                validation_enabled: true,
                verbose_logging: true,
                cooldown_memory_percent: 80.0,
            },
            reduced: OperationProfile {
                batch_size: 20,
                pause_between_batches: Duration::from_secs(2),
                max_concurrent_ops: 2,
                max_file_size_mb: 50,
                max_output_lines: 5_000,
                validation_enabled: true,
                verbose_logging: false,
                cooldown_memory_percent: 85.0,
            },
            minimal: OperationProfile {
                batch_size: 5,
                pause_between_batches: Duration::from_secs(5),
                max_concurrent_ops: 1,
                max_file_size_mb: 10,
                max_output_lines: 1_000,
                validation_enabled: false,
                verbose_logging: false,
                cooldown_memory_percent: 90.0,
            },
            emergency: OperationProfile {
                batch_size: 1,
                pause_between_batches: Duration::from_secs(15),
                max_concurrent_ops: 1,
                max_file_size_mb: 1,
                max_output_lines: 100,
                validation_enabled: false,
                verbose_logging: false,
                cooldown_memory_percent: 95.0,
            },
        }
    }
}
