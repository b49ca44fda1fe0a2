use serde::{Deserialize, Serialize};

/// Operating constraint band derived from host pressure.
///
/// Variants are declared worst-first so the derived ordering reads
/// `Emergency < Minimal < Reduced < Optimal`: a level is "at least as good"
/// as another when it compares greater or equal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceLevel {
    Emergency,
    Minimal,
    Reduced,
    Optimal,
}

impl PerformanceLevel {
    pub const ALL: [Self; 4] = [Self::Optimal, Self::Reduced, Self::Minimal, Self::Emergency];

    /// Returns `true` when `self` is at least as good as `target`.
    #[must_use]
    pub fn satisfies(self, target: Self) -> bool {
        self >= target
    }
}

impl std::fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimal => write!(f, "OPTIMAL"),
            Self::Reduced => write!(f, "REDUCED"),
            Self::Minimal => write!(f, "MINIMAL"),
            Self::Emergency => write!(f, "EMERGENCY"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_worst_to_best() {
        assert!(PerformanceLevel::Emergency < PerformanceLevel::Minimal);
        assert!(PerformanceLevel::Minimal < PerformanceLevel::Reduced);
        assert!(PerformanceLevel::Reduced < PerformanceLevel::Optimal);
    }

    #[test]
    fn satisfies_is_at_least_as_good() {
        assert!(PerformanceLevel::Optimal.satisfies(PerformanceLevel::Reduced));
        assert!(PerformanceLevel::Reduced.satisfies(PerformanceLevel::Reduced));
        assert!(!PerformanceLevel::Minimal.satisfies(PerformanceLevel::Reduced));
    }

    #[test]
    fn serde_uses_lowercase_keys() {
        let json = serde_json::to_string(&PerformanceLevel::Minimal).expect("serialize");
        assert_eq!(json, "\"minimal\"");
    }
}
