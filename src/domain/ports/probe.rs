use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("component unreachable: {0}")]
    Unreachable(String),
    #[error("probe timed out")]
    TimedOut,
    #[error("restart not supported by component '{0}'")]
    RestartUnsupported(String),
    #[error("restart failed: {0}")]
    RestartFailed(String),
}

/// Liveness check for one supervised component.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Stable component name used in status documents
    fn name(&self) -> &str;

    /// Check that the component is alive and behaving.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` when the component does not respond correctly.
    async fn check(&self) -> Result<(), ProbeError>;

    /// Best-effort restart after repeated failures.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` if the component cannot be restarted.
    async fn restart(&self) -> Result<(), ProbeError> {
        Err(ProbeError::RestartUnsupported(self.name().to_string()))
    }
}
