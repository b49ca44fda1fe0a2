use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::severity::{Severity, ThresholdSeverity};

/// Alert type identifiers
pub mod kind {
    pub const MEMORY_TREND: &str = "memory_trend";
    pub const CPU_SUSTAINED: &str = "cpu_sustained";
    pub const PROCESS_GROWTH: &str = "process_growth";
    pub const COMPOUND_INSTABILITY: &str = "compound_instability";
    pub const DISK_SPACE: &str = "disk_space";
    pub const COMPONENT_UNREACHABLE: &str = "component_unreachable";
}

/// Structured, severity-levelled notice of a detected risk.
///
/// Fields are private so that severity cannot change after creation; only the
/// alert's membership in the active set changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    id: String,
    severity: Severity,
    #[serde(rename = "type")]
    kind: String,
    message: String,
    data: serde_json::Value,
    timestamp: DateTime<Utc>,
}

impl Alert {
    #[must_use]
    pub fn new(
        severity: Severity,
        kind: impl Into<String>,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            severity,
            kind: kind.into(),
            message: message.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn data(&self) -> &serde_json::Value {
        &self.data
    }

    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Resource a single-sample threshold applies to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Memory,
    Cpu,
    Disk,
    Processes,
    ProcessMemory,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Cpu => write!(f, "cpu"),
            Self::Disk => write!(f, "disk"),
            Self::Processes => write!(f, "processes"),
            Self::ProcessMemory => write!(f, "process memory"),
        }
    }
}

/// Threshold breach derived from one snapshot. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdAlert {
    pub resource: Resource,
    pub severity: ThresholdSeverity,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
}
