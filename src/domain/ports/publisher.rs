use thiserror::Error;

use crate::domain::entities::status::StatusReport;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("failed to serialize status: {0}")]
    Serialization(String),
    #[error("failed to write status: {0}")]
    WriteFailed(String),
}

/// Output boundary for the status document consumed by dashboards.
pub trait StatusPublisher: Send + Sync {
    /// Publish one status document. Readers must never observe a partial write.
    ///
    /// # Errors
    ///
    /// Returns `PublishError` if the document cannot be serialized or written.
    fn publish(&self, report: &StatusReport) -> Result<(), PublishError>;
}
