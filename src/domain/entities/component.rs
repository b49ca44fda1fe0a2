use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liveness bookkeeping for one supervised component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub name: String,
    pub active: bool,
    pub last_check_time: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub restart_attempts: u32,
    /// Set once restarts are exhausted; auto-restart stops for good
    pub escalated: bool,
    pub last_error: Option<String>,
}

impl ComponentStatus {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: false,
            last_check_time: None,
            consecutive_failures: 0,
            restart_attempts: 0,
            escalated: false,
            last_error: None,
        }
    }
}
