use serde::{Deserialize, Serialize};

/// Severity level for alerts raised by the warning engine and the supervisor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
    Emergency,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Critical => write!(f, "CRITICAL"),
            Self::Emergency => write!(f, "EMERGENCY"),
        }
    }
}

impl Severity {
    #[must_use]
    pub const fn color(&self) -> &str {
        match self {
            Self::Info => "blue",
            Self::Warning => "yellow",
            Self::Critical => "red",
            Self::Emergency => "bright red",
        }
    }
}

/// Severity of a single-sample threshold breach. Only two bands exist.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThresholdSeverity {
    Warning,
    Critical,
}

impl From<ThresholdSeverity> for Severity {
    fn from(value: ThresholdSeverity) -> Self {
        match value {
            ThresholdSeverity::Warning => Self::Warning,
            ThresholdSeverity::Critical => Self::Critical,
        }
    }
}

impl std::fmt::Display for ThresholdSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Severity::from(*self).fmt(f)
    }
}
