pub mod alert;
pub mod batch;
pub mod component;
pub mod snapshot;
pub mod status;
pub mod window;

pub use alert::{Alert, Resource, ThresholdAlert};
pub use batch::{BatchReport, ItemError, ItemOutcome, SchedulerError, StopReason};
pub use component::ComponentStatus;
pub use snapshot::Snapshot;
pub use status::{StatusReport, SystemLoad};
pub use window::SnapshotWindow;
