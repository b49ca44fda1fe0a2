use serde::{Deserialize, Serialize};

/// Tuning for the rolling-window analyzers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSettings {
    /// Memory growth, in percentage points per minute, above which a trend is projected
    pub memory_rate_per_minute: f64,
    /// Memory level the projection counts down to
    pub projection_target_percent: f64,
    /// Projected minutes below which the trend is an emergency
    pub emergency_minutes: f64,
    /// Projected minutes below which the trend is critical
    pub critical_minutes: f64,
    /// Minimum samples before a regression is attempted
    pub min_trend_samples: usize,
    /// CPU percentage considered "sustained high"
    pub cpu_sustained_percent: f64,
    /// Number of consecutive samples that must all exceed `cpu_sustained_percent`
    pub cpu_sustained_samples: usize,
    /// Process count growth that raises a warning
    pub process_growth_min: usize,
    /// Samples looked back over for process growth (at least 3 are required)
    pub process_growth_lookback: usize,
    /// Samples over which compound conditions must hold
    pub compound_samples: usize,
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            memory_rate_per_minute: 2.0,
            projection_target_percent: 90.0,
            emergency_minutes: 5.0,
            critical_minutes: 15.0,
            min_trend_samples: 3,
            cpu_sustained_percent: 85.0,
            cpu_sustained_samples: 10,
            process_growth_min: 2,
            process_growth_lookback: 5,
            compound_samples: 5,
        }
    }
}
