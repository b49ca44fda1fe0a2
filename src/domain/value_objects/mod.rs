pub mod op_class;
pub mod operation_profile;
pub mod performance_level;
pub mod severity;
pub mod thresholds;
pub mod trend_settings;

pub use op_class::OpClass;
pub use operation_profile::{OperationProfile, ProfileTable};
pub use performance_level::PerformanceLevel;
pub use severity::{Severity, ThresholdSeverity};
pub use thresholds::ThresholdSet;
pub use trend_settings::TrendSettings;
