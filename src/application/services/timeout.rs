//! Duration bounds for in-process work.
//!
//! Cancellation here is cooperative: a timed-out future is dropped at its next
//! await point, and a blocking closure keeps running on its worker thread after
//! the caller has been released. Use the subprocess runner when the work must
//! actually be stopped.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::domain::entities::batch::{ItemError, ItemOutcome};

/// Either the deadline passed or the operation itself failed. The two are
/// never conflated.
#[derive(Error, Debug)]
pub enum TimeoutError<E> {
    #[error("operation '{operation}' exceeded its {timeout:?} timeout")]
    Exceeded { operation: String, timeout: Duration },
    #[error("operation failed: {0}")]
    Failed(E),
}

impl<E> TimeoutError<E> {
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Exceeded { .. })
    }
}

type CancelHook = Box<dyn FnOnce() + Send + Sync>;

/// Deadline for one call. Arms a timer task on creation; dropping the scope
/// cancels the timer, on every exit path, exactly once.
///
/// Must be created inside a tokio runtime.
pub struct ScopedTimeout {
    operation: String,
    duration: Duration,
    deadline: Instant,
    fired: Arc<AtomicBool>,
    token: CancellationToken,
    timer: JoinHandle<()>,
    on_cancel: Option<CancelHook>,
}

impl ScopedTimeout {
    #[must_use]
    pub fn new(duration: Duration, operation: impl Into<String>) -> Self {
        let deadline = Instant::now() + duration;
        let fired = Arc::new(AtomicBool::new(false));
        let token = CancellationToken::new();
        let timer = {
            let fired = fired.clone();
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                fired.store(true, Ordering::SeqCst);
                token.cancel();
            })
        };
        Self {
            operation: operation.into(),
            duration,
            deadline,
            fired,
            token,
            timer,
            on_cancel: None,
        }
    }

    /// Runs `hook` when the scope's timer is cancelled on drop.
    #[must_use]
    pub fn on_cancel(mut self, hook: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.on_cancel = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Whether the timer task has fired.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Whether the deadline has passed, whether or not the timer task has run yet.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.is_fired() || Instant::now() >= self.deadline
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Cancelled when the deadline passes.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Resolves once the deadline has passed.
    pub async fn expired_wait(&self) {
        self.token.cancelled().await;
    }

    fn exceeded<E>(&self) -> TimeoutError<E> {
        TimeoutError::Exceeded {
            operation: self.operation.clone(),
            timeout: self.duration,
        }
    }
}

impl Drop for ScopedTimeout {
    fn drop(&mut self) {
        self.timer.abort();
        if let Some(hook) = self.on_cancel.take() {
            hook();
        }
    }
}

/// Bounds `fut` by `duration`.
///
/// # Errors
///
/// Returns `TimeoutError::Exceeded` when the deadline passes first, or
/// `TimeoutError::Failed` with the operation's own error.
pub async fn run_with_timeout<T, E, F>(
    operation: &str,
    duration: Duration,
    fut: F,
) -> Result<T, TimeoutError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    let scope = ScopedTimeout::new(duration, operation);
    run_in_scope(&scope, fut).await
}

async fn run_in_scope<T, E, F>(scope: &ScopedTimeout, fut: F) -> Result<T, TimeoutError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    tokio::select! {
        biased;
        result = fut => result.map_err(TimeoutError::Failed),
        () = scope.expired_wait() => {
            tracing::warn!("Operation '{}' timed out after {:?}", scope.operation(), scope.duration());
            Err(scope.exceeded())
        }
    }
}

/// Bounds a blocking closure by `duration`.
///
/// On timeout the caller is released but the closure keeps running on its
/// blocking thread until it returns on its own.
///
/// # Errors
///
/// Returns `TimeoutError::Exceeded` when the deadline passes first, or
/// `TimeoutError::Failed` with the closure's own error.
pub async fn run_blocking_with_timeout<T, E, F>(
    operation: &str,
    duration: Duration,
    f: F,
) -> Result<T, TimeoutError<E>>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(f);
    let joined = async move {
        match handle.await {
            Ok(result) => result,
            Err(join_error) => std::panic::resume_unwind(join_error.into_panic()),
        }
    };
    run_with_timeout(operation, duration, joined).await
}

/// Limits for `run_iterative`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterativeLimits {
    pub per_item: Duration,
    pub total_budget: Duration,
}

#[derive(Debug)]
pub struct IterativeReport<T> {
    /// One slot per input item, in input order
    pub outcomes: Vec<ItemOutcome<T>>,
    pub budget_exhausted: bool,
    pub elapsed: Duration,
}

/// Runs `f` over `items` in order, each bounded by `per_item`, all within
/// `total_budget`.
///
/// Stops starting new items once the remaining budget is below `per_item`;
/// every item not started gets a `BudgetExhausted` slot so the outcome count
/// always equals the input count.
pub async fn run_iterative<I, T, E, F, Fut>(
    operation: &str,
    items: Vec<I>,
    limits: IterativeLimits,
    mut f: F,
) -> IterativeReport<T>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let started = Instant::now();
    let total = items.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut budget_exhausted = false;

    for (index, item) in items.into_iter().enumerate() {
        let remaining = limits.total_budget.saturating_sub(started.elapsed());
        if remaining < limits.per_item {
            budget_exhausted = true;
            tracing::warn!(
                "'{operation}': budget exhausted after {index}/{total} item(s)"
            );
            break;
        }
        let name = format!("{operation}[{index}]");
        let outcome = match run_with_timeout(&name, limits.per_item, f(item)).await {
            Ok(value) => ItemOutcome::Succeeded(value),
            Err(TimeoutError::Exceeded { timeout, .. }) => {
                ItemOutcome::Failed(ItemError::TimedOut { after: timeout })
            }
            Err(TimeoutError::Failed(e)) => ItemOutcome::Failed(ItemError::Failed(e.to_string())),
        };
        outcomes.push(outcome);
    }

    outcomes.resize_with(total, || ItemOutcome::Failed(ItemError::BudgetExhausted));

    IterativeReport {
        outcomes,
        budget_exhausted,
        elapsed: started.elapsed(),
    }
}
