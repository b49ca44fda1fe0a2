use thiserror::Error;

/// The two steps of subprocess escalation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Polite request; the child may trap or ignore it
    Terminate,
    /// Cannot be caught
    Kill,
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("no such process or group: {0}")]
    NotFound(u32),
    #[error("not permitted to signal {0}")]
    PermissionDenied(u32),
    #[error("signal delivery failed: {0}")]
    SignalFailed(String),
}

pub trait ProcessManager: Send + Sync {
    /// Send a signal to a single process.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError` if the process is not found,
    /// permission is denied, or the signal fails.
    fn signal(&self, pid: u32, signal: Signal) -> Result<(), ProcessError>;

    /// Send a signal to every process in the group led by `pgid`.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError` if the group is gone,
    /// permission is denied, or the signal fails.
    fn signal_group(&self, pgid: u32, signal: Signal) -> Result<(), ProcessError>;
}
