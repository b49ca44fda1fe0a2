use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::entities::alert::Alert;
use crate::domain::ports::alert_log::{AlertLog, AlertLogError};

const DEFAULT_LOG_PATH: &str = "~/.local/share/warden/alerts.jsonl";

/// Appends every alert as one JSON object per line.
pub struct JsonlAlertLog {
    path: PathBuf,
}

impl JsonlAlertLog {
    #[must_use]
    pub fn new(path: &str) -> Self {
        let expanded = shellexpand::tilde(path);
        Self {
            path: PathBuf::from(expanded.as_ref()),
        }
    }

    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_json_line(&self, value: &serde_json::Value) -> Result<(), AlertLogError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AlertLogError::AppendFailed(format!("cannot create parent directory: {e}"))
            })?;
        }

        let json = serde_json::to_string(value)
            .map_err(|e| AlertLogError::AppendFailed(format!("JSON serialization error: {e}")))?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AlertLogError::AppendFailed(format!("cannot open alert log: {e}")))?;

        writeln!(file, "{json}")
            .map_err(|e| AlertLogError::AppendFailed(format!("cannot write alert log: {e}")))
    }
}

impl Default for JsonlAlertLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_PATH)
    }
}

impl AlertLog for JsonlAlertLog {
    fn append(&self, alert: &Alert) -> Result<(), AlertLogError> {
        let entry = serde_json::to_value(alert)
            .map_err(|e| AlertLogError::AppendFailed(format!("JSON serialization error: {e}")))?;
        self.append_json_line(&entry)
    }
}
