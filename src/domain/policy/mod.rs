//! Pure decision functions over snapshots. No I/O, no clocks.

pub mod admission;
pub mod degradation;
pub mod health;

pub use admission::{admit, evaluate, AdmissionDecision};
pub use degradation::{adapt_parameters, level_for, should_defer, DeferDecision, OperationParameters};
pub use health::{reliability_score, system_healthy};
