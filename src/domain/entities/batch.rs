use std::time::Duration;

use thiserror::Error;

/// Why a single item did not produce a value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error("item exceeded its {after:?} timeout")]
    TimedOut { after: Duration },
    #[error("item failed: {0}")]
    Failed(String),
    #[error("not admitted: {0}")]
    NotAdmitted(String),
    #[error("total time budget exhausted before the item could start")]
    BudgetExhausted,
}

/// Outcome of one item in a batch or an iterative run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome<T> {
    Succeeded(T),
    Failed(ItemError),
}

impl<T> ItemOutcome<T> {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Succeeded(value) => Some(value),
            Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub const fn error(&self) -> Option<&ItemError> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed(error) => Some(error),
        }
    }
}

/// Why a batch run stopped before processing every item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The caller cancelled the run; outcomes hold only the processed prefix
    Interrupted,
    /// Admission stayed denied after waiting for the level to recover
    AdmissionDenied { batch_index: usize, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("batch {batch_index} not admitted: {reason} ({unprocessed} item(s) not run)")]
    AdmissionDenied {
        batch_index: usize,
        reason: String,
        unprocessed: usize,
    },
    #[error("batch run interrupted after {processed} item(s)")]
    Interrupted { processed: usize },
}

/// Ordered per-item outcomes of a scheduled run plus pacing bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport<T> {
    pub outcomes: Vec<ItemOutcome<T>>,
    /// Size of every batch that was started, in order
    pub batch_sizes: Vec<usize>,
    /// Inter-batch pauses taken
    pub pauses: usize,
    /// In-batch memory cooldowns taken
    pub cooldowns: usize,
    pub stop: Option<StopReason>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            outcomes: Vec::new(),
            batch_sizes: Vec::new(),
            pauses: 0,
            cooldowns: 0,
            stop: None,
        }
    }
}

impl<T> BatchReport<T> {
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.stop.is_none()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Converts an early stop into an error for callers that want `?`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError` when the run was interrupted or refused admission.
    pub fn ensure_complete(&self) -> Result<(), SchedulerError> {
        match &self.stop {
            None => Ok(()),
            Some(StopReason::Interrupted) => Err(SchedulerError::Interrupted {
                processed: self.outcomes.len(),
            }),
            Some(StopReason::AdmissionDenied {
                batch_index,
                reason,
            }) => Err(SchedulerError::AdmissionDenied {
                batch_index: *batch_index,
                reason: reason.clone(),
                unprocessed: self
                    .outcomes
                    .iter()
                    .filter(|o| matches!(o.error(), Some(ItemError::NotAdmitted(_))))
                    .count(),
            }),
        }
    }
}

/// Splits `items` into consecutive chunks of at most `batch_size` (minimum 1).
#[must_use]
pub fn split_batches<T>(items: Vec<T>, batch_size: usize) -> Vec<Vec<T>> {
    let size = batch_size.max(1);
    let mut batches = Vec::with_capacity(items.len().div_ceil(size));
    let mut current = Vec::with_capacity(size);
    for item in items {
        current.push(item);
        if current.len() == size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
