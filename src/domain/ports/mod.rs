pub mod alert_log;
pub mod collector;
pub mod probe;
pub mod process_manager;
pub mod publisher;

pub use alert_log::{AlertLog, AlertLogError, NullAlertLog};
pub use collector::{CollectionError, MetricsSource};
pub use probe::{Probe, ProbeError};
pub use process_manager::{ProcessError, ProcessManager, Signal};
pub use publisher::{PublishError, StatusPublisher};
