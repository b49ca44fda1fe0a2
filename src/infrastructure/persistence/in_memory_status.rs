use std::sync::Mutex;

use crate::domain::entities::status::StatusReport;
use crate::domain::ports::publisher::{PublishError, StatusPublisher};

/// Keeps the last published status in memory, for embedding and tests.
pub struct InMemoryStatusPublisher {
    latest: Mutex<Option<StatusReport>>,
    count: Mutex<usize>,
}

impl InMemoryStatusPublisher {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latest: Mutex::new(None),
            count: Mutex::new(0),
        }
    }

    #[must_use]
    pub fn latest(&self) -> Option<StatusReport> {
        self.latest.lock().ok().and_then(|latest| latest.clone())
    }

    /// Number of documents published so far
    #[must_use]
    pub fn published(&self) -> usize {
        self.count.lock().map_or(0, |count| *count)
    }
}

impl Default for InMemoryStatusPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusPublisher for InMemoryStatusPublisher {
    fn publish(&self, report: &StatusReport) -> Result<(), PublishError> {
        *self
            .latest
            .lock()
            .map_err(|_| PublishError::WriteFailed("lock poisoned".into()))? = Some(report.clone());
        *self
            .count
            .lock()
            .map_err(|_| PublishError::WriteFailed("lock poisoned".into()))? += 1;
        Ok(())
    }
}
