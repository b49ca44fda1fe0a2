use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::performance_level::PerformanceLevel;

/// Class of a requested operation, used by admission and deferral decisions
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OpClass {
    Read,
    Status,
    Cleanup,
    #[default]
    Standard,
    Analysis,
    Bulk,
    Parallel,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown operation class: '{0}' (expected read, status, cleanup, standard, analysis, bulk or parallel)")]
pub struct ParseOpClassError(pub String);

impl OpClass {
    pub const ALL: [Self; 7] = [
        Self::Read,
        Self::Status,
        Self::Cleanup,
        Self::Standard,
        Self::Analysis,
        Self::Bulk,
        Self::Parallel,
    ];

    /// Worst level at which this class is still allowed to run.
    #[must_use]
    pub const fn required_level(self) -> PerformanceLevel {
        match self {
            Self::Read | Self::Status | Self::Cleanup => PerformanceLevel::Emergency,
            Self::Standard => PerformanceLevel::Minimal,
            Self::Analysis => PerformanceLevel::Reduced,
            Self::Bulk | Self::Parallel => PerformanceLevel::Optimal,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Status => "status",
            Self::Cleanup => "cleanup",
            Self::Standard => "standard",
            Self::Analysis => "analysis",
            Self::Bulk => "bulk",
            Self::Parallel => "parallel",
        }
    }
}

impl std::fmt::Display for OpClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OpClass {
    type Err = ParseOpClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|class| class.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseOpClassError(s.to_string()))
    }
}
