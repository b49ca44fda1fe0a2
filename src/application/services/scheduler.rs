use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::degradation::DegradationController;
use super::sampler::ResourceSampler;
use super::timeout::{run_with_timeout, TimeoutError};
use crate::domain::entities::batch::{split_batches, BatchReport, ItemError, ItemOutcome, StopReason};
use crate::domain::policy::degradation::OperationParameters;
use crate::domain::value_objects::op_class::OpClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Delay between consecutive items of one batch
    pub inter_item_delay: Duration,
    /// Re-sample memory after every this many items; 0 disables cooldowns
    pub cooldown_every: usize,
    pub cooldown: Duration,
    /// How long a refused batch keeps re-checking admission
    pub admission_wait: Duration,
    pub item_timeout: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            inter_item_delay: Duration::from_millis(100),
            cooldown_every: 5,
            cooldown: Duration::from_secs(10),
            admission_wait: Duration::from_secs(60),
            item_timeout: Duration::from_secs(300),
        }
    }
}

/// Splits work into level-sized batches and paces them against host pressure.
pub struct BatchScheduler {
    sampler: Arc<ResourceSampler>,
    degradation: Arc<DegradationController>,
    settings: SchedulerSettings,
}

/// Sleeps unless cancelled first. Returns `false` when cancelled.
async fn pause(duration: Duration, token: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !token.is_cancelled();
    }
    tokio::select! {
        biased;
        () = token.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

impl BatchScheduler {
    #[must_use]
    pub fn new(
        sampler: Arc<ResourceSampler>,
        degradation: Arc<DegradationController>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            sampler,
            degradation,
            settings,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Runs `f` over `items` in input order.
    ///
    /// The batch size comes from the current level's profile, tightened by
    /// `requested_batch_size`. Every batch must pass admission for `op_class`;
    /// a refused batch waits for the level to recover, and if it is still
    /// refused the run stops with `StopReason::AdmissionDenied` and every
    /// remaining item gets a `NotAdmitted` slot. Cancelling `token` stops at
    /// once and returns only the outcomes collected so far.
    pub async fn run_batch<I, T, E, F, Fut>(
        &self,
        items: Vec<I>,
        op_class: OpClass,
        requested_batch_size: Option<usize>,
        mut f: F,
        token: &CancellationToken,
    ) -> BatchReport<T>
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let level = self.degradation.current_level();
        let profile = self.degradation.profile(level);
        let requested = OperationParameters {
            batch_size: requested_batch_size.unwrap_or(profile.batch_size),
            ..OperationParameters::from(profile)
        };
        let params = self.degradation.adapt_parameters(&requested, level);
        let cooldown_threshold = profile.cooldown_memory_percent;

        let total = items.len();
        let batches = split_batches(items, params.batch_size);
        let batch_count = batches.len();
        tracing::info!(
            "Running {total} {op_class} item(s) in {batch_count} batch(es) of up to {} at {level}",
            params.batch_size.max(1)
        );

        let mut report = BatchReport::default();
        let mut processed = 0_usize;
        let mut batches = batches.into_iter().enumerate();

        while let Some((batch_index, batch)) = batches.next() {
            if token.is_cancelled() {
                report.stop = Some(StopReason::Interrupted);
                return report;
            }

            if let Err(reason) = self.admit(op_class, token).await {
                let Some(reason) = reason else {
                    report.stop = Some(StopReason::Interrupted);
                    return report;
                };
                tracing::warn!("Batch {batch_index} refused: {reason}");
                let unprocessed = batch.len() + batches.by_ref().map(|(_, b)| b.len()).sum::<usize>();
                report.outcomes.extend(
                    (0..unprocessed)
                        .map(|_| ItemOutcome::Failed(ItemError::NotAdmitted(reason.clone()))),
                );
                report.stop = Some(StopReason::AdmissionDenied {
                    batch_index,
                    reason,
                });
                return report;
            }

            tracing::debug!("Batch {}/{batch_count}: {} item(s)", batch_index + 1, batch.len());
            report.batch_sizes.push(batch.len());

            for (position, item) in batch.into_iter().enumerate() {
                if position > 0 && !pause(self.settings.inter_item_delay, token).await {
                    report.stop = Some(StopReason::Interrupted);
                    return report;
                }

                let name = format!("{op_class}[{processed}]");
                let outcome = tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        report.stop = Some(StopReason::Interrupted);
                        return report;
                    }
                    result = run_with_timeout(&name, self.settings.item_timeout, f(item)) => match result {
                        Ok(value) => ItemOutcome::Succeeded(value),
                        Err(TimeoutError::Exceeded { timeout, .. }) => {
                            ItemOutcome::Failed(ItemError::TimedOut { after: timeout })
                        }
                        Err(TimeoutError::Failed(e)) => {
                            tracing::debug!("Item {name} failed: {e}");
                            ItemOutcome::Failed(ItemError::Failed(e.to_string()))
                        }
                    },
                };
                report.outcomes.push(outcome);
                processed += 1;

                if self.settings.cooldown_every > 0
                    && processed % self.settings.cooldown_every == 0
                    && processed < total
                    && self.memory_above(cooldown_threshold)
                {
                    tracing::info!(
                        "Memory above {cooldown_threshold:.0}%, cooling down for {:?}",
                        self.settings.cooldown
                    );
                    if !pause(self.settings.cooldown, token).await {
                        report.stop = Some(StopReason::Interrupted);
                        return report;
                    }
                    report.cooldowns += 1;
                }
            }

            if batch_index + 1 < batch_count {
                if !pause(params.pause, token).await {
                    report.stop = Some(StopReason::Interrupted);
                    return report;
                }
                report.pauses += 1;
            }
        }

        tracing::info!(
            "Batch run finished: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }

    /// `Ok` when admitted, `Err(Some(reason))` when still refused after
    /// waiting, `Err(None)` when cancelled while waiting.
    ///
    /// Re-runs admission itself on every poll: a refusal on cpu or disk can
    /// persist at a level that already satisfies the class.
    async fn admit(&self, op_class: OpClass, token: &CancellationToken) -> Result<(), Option<String>> {
        let mut decision = self.sampler.admit(op_class);
        if decision.allowed {
            return Ok(());
        }
        tracing::info!(
            "{}; waiting up to {:?} for recovery",
            decision.reason,
            self.settings.admission_wait
        );
        let deadline = Instant::now() + self.settings.admission_wait;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(Some(decision.reason));
            }
            let step = self.degradation.poll_interval().min(deadline - now);
            if !pause(step, token).await {
                return Err(None);
            }
            decision = self.sampler.admit(op_class);
            if decision.allowed {
                tracing::info!("{op_class} admitted after waiting");
                return Ok(());
            }
        }
    }

    fn memory_above(&self, threshold: f64) -> bool {
        match self.sampler.sample() {
            Ok(snapshot) => snapshot.memory_percent > threshold,
            Err(e) => {
                tracing::debug!("Cooldown check skipped: {e}");
                false
            }
        }
    }
}
