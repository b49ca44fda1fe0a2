use thiserror::Error;

use crate::domain::entities::snapshot::Snapshot;

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("failed to collect system metrics: {0}")]
    MetricsUnavailable(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("timeout while collecting data")]
    Timeout,
}

/// Boundary to whatever reads live host state.
pub trait MetricsSource: Send + Sync {
    /// Collect a fresh snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` if metrics are unavailable,
    /// permission is denied, or collection times out.
    fn collect(&self) -> Result<Snapshot, CollectionError>;

    /// Drop any cached OS handles so the next `collect` starts clean.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` if the source cannot be reinitialised.
    fn reset(&self) -> Result<(), CollectionError> {
        Ok(())
    }
}
