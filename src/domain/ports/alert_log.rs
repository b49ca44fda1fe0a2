use thiserror::Error;

use crate::domain::entities::alert::Alert;

#[derive(Error, Debug)]
pub enum AlertLogError {
    #[error("failed to append alert: {0}")]
    AppendFailed(String),
}

/// Append-only structured record of every alert ever raised.
pub trait AlertLog: Send + Sync {
    /// Append one alert record.
    ///
    /// # Errors
    ///
    /// Returns `AlertLogError` if the record cannot be written.
    fn append(&self, alert: &Alert) -> Result<(), AlertLogError>;
}

/// Alert log that discards everything.
pub struct NullAlertLog;

impl AlertLog for NullAlertLog {
    fn append(&self, _alert: &Alert) -> Result<(), AlertLogError> {
        Ok(())
    }
}
