use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::domain::entities::status::StatusReport;
use crate::domain::ports::publisher::{PublishError, StatusPublisher};

/// Writes the status document to a JSON file.
///
/// Each publish goes to a temporary file in the same directory which is then
/// renamed over the target, so readers see either the old or the new document.
pub struct JsonStatusFile {
    path: PathBuf,
}

impl JsonStatusFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads back the last published document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or not a valid status document.
    pub fn read(&self) -> anyhow::Result<StatusReport> {
        use anyhow::Context;

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("cannot read {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid status document in {}", self.path.display()))
    }
}

impl StatusPublisher for JsonStatusFile {
    fn publish(&self, report: &StatusReport) -> Result<(), PublishError> {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| PublishError::Serialization(e.to_string()))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .map_err(|e| PublishError::WriteFailed(format!("cannot create {}: {e}", dir.display())))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(|e| PublishError::WriteFailed(format!("cannot create temp file: {e}")))?;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| PublishError::WriteFailed(format!("cannot write temp file: {e}")))?;
        tmp.persist(&self.path)
            .map_err(|e| PublishError::WriteFailed(format!("cannot replace {}: {e}", self.path.display())))?;
        Ok(())
    }
}
