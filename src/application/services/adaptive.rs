use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use super::timeout::{run_with_timeout, TimeoutError};

const P95: f64 = 0.95;
const HEADROOM: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptiveSettings {
    pub min: Duration,
    pub max: Duration,
    /// Used until an operation has a successful run on record
    pub default: Duration,
    /// Successful durations kept per operation
    pub history_len: usize,
}

impl Default for AdaptiveSettings {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(600),
            default: Duration::from_secs(60),
            history_len: 10,
        }
    }
}

/// Per-operation timeouts learned from recent successful runs.
pub struct AdaptiveTimeouts {
    settings: AdaptiveSettings,
    history: Mutex<HashMap<String, VecDeque<Duration>>>,
}

impl AdaptiveTimeouts {
    #[must_use]
    pub fn new(settings: AdaptiveSettings) -> Self {
        Self {
            settings: AdaptiveSettings {
                max: settings.max.max(settings.min),
                ..settings
            },
            history: Mutex::new(HashMap::new()),
        }
    }

    /// `clamp(p95 * 1.5, min, max)` over the recorded successes, or the
    /// default (also clamped) with no history.
    #[must_use]
    pub fn timeout_for(&self, operation: &str) -> Duration {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let target = history
            .get(operation)
            .and_then(|samples| percentile(samples, P95))
            .map_or(self.settings.default, |p95| p95.mul_f64(HEADROOM));
        target.clamp(self.settings.min, self.settings.max)
    }

    pub fn record_success(&self, operation: &str, elapsed: Duration) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let samples = history.entry(operation.to_string()).or_default();
        if samples.len() >= self.settings.history_len.max(1) {
            samples.pop_front();
        }
        samples.push_back(elapsed);
    }

    #[must_use]
    pub fn samples(&self, operation: &str) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(operation)
            .map_or(0, VecDeque::len)
    }

    /// Runs `fut` under the learned timeout; only successes update history.
    ///
    /// # Errors
    ///
    /// Same as `run_with_timeout`.
    pub async fn run<T, E, F>(&self, operation: &str, fut: F) -> Result<T, TimeoutError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        let timeout = self.timeout_for(operation);
        let started = Instant::now();
        let result = run_with_timeout(operation, timeout, fut).await;
        if result.is_ok() {
            self.record_success(operation, started.elapsed());
        }
        result
    }
}

/// Nearest-rank percentile.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn percentile(samples: &VecDeque<Duration>, p: f64) -> Option<Duration> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted: Vec<Duration> = samples.iter().copied().collect();
    sorted.sort_unstable();
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted.get(rank.saturating_sub(1).min(sorted.len() - 1)).copied()
}
