#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use warden::application::services::degradation::DegradationController;
use warden::application::services::sampler::ResourceSampler;
use warden::application::services::scheduler::{BatchScheduler, SchedulerSettings};
use warden::domain::entities::batch::{ItemError, ItemOutcome, StopReason};
use warden::domain::entities::snapshot::Snapshot;
use warden::domain::ports::collector::{CollectionError, MetricsSource};
use warden::domain::value_objects::op_class::OpClass;
use warden::domain::value_objects::operation_profile::ProfileTable;
use warden::domain::value_objects::thresholds::ThresholdSet;

// ---------------------------------------------------------------------------
// Adjustable host
// ---------------------------------------------------------------------------

struct Host {
    memory: Mutex<f64>,
    cpu: Mutex<f64>,
}

impl Host {
    fn new(memory: f64) -> Arc<Self> {
        Arc::new(Self {
            memory: Mutex::new(memory),
            cpu: Mutex::new(5.0),
        })
    }

    fn set(&self, memory: f64) {
        *self.memory.lock().expect("lock") = memory;
    }

    fn set_cpu(&self, cpu: f64) {
        *self.cpu.lock().expect("lock") = cpu;
    }
}

impl MetricsSource for Host {
    fn collect(&self) -> Result<Snapshot, CollectionError> {
        Ok(Snapshot {
            timestamp: Utc::now(),
            memory_percent: *self.memory.lock().expect("lock"),
            memory_available_bytes: 1_000_000_000,
            cpu_percent: *self.cpu.lock().expect("lock"),
            disk_percent: 30.0,
            disk_free_bytes: 50_000_000_000,
            matched_process_count: 0,
            matched_process_memory_mb: 0,
        })
    }
}

fn settings() -> SchedulerSettings {
    SchedulerSettings {
        inter_item_delay: Duration::ZERO,
        cooldown_every: 5,
        cooldown: Duration::from_secs(10),
        admission_wait: Duration::from_secs(20),
        item_timeout: Duration::from_secs(30),
    }
}

fn scheduler(host: Arc<Host>, settings: SchedulerSettings) -> BatchScheduler {
    scheduler_with(host, ThresholdSet::default(), settings)
}

fn scheduler_with(
    host: Arc<Host>,
    thresholds: ThresholdSet,
    settings: SchedulerSettings,
) -> BatchScheduler {
    let sampler = Arc::new(ResourceSampler::new(host, thresholds));
    let degradation = Arc::new(DegradationController::new(
        sampler.clone(),
        ProfileTable::default(),
        Duration::from_secs(5),
    ));
    BatchScheduler::new(sampler, degradation, settings)
}

#[tokio::test(start_paused = true)]
async fn pressure_mid_run_stops_remaining_batches() {
    let host = Host::new(50.0);
    let s = scheduler(host.clone(), settings());
    let token = CancellationToken::new();

    let started = Instant::now();
    let report = s
        .run_batch(
            (0..6).collect::<Vec<u32>>(),
            OpClass::Standard,
            Some(2),
            |n| {
                if n == 3 {
                    host.set(93.0);
                }
                async move { Ok::<_, String>(n) }
            },
            &token,
        )
        .await;

    assert_eq!(report.outcomes.len(), 6);
    assert_eq!(report.succeeded(), 4);
    assert!(matches!(
        report.outcomes[4],
        ItemOutcome::Failed(ItemError::NotAdmitted(_))
    ));
    assert!(matches!(
        report.stop,
        Some(StopReason::AdmissionDenied { batch_index: 2, .. })
    ));
    assert_eq!(report.batch_sizes, vec![2, 2]);
    // The refused batch held out for the whole admission window.
    assert!(started.elapsed() >= settings().admission_wait);
}

#[tokio::test(start_paused = true)]
async fn critical_cpu_mid_run_is_waited_out() {
    // CPU at 91% leaves the level at MINIMAL, which standard work tolerates,
    // but the cpu threshold still refuses admission until it clears.
    let host = Host::new(40.0);
    let s = scheduler(host.clone(), settings());
    let token = CancellationToken::new();

    let relief = {
        let host = host.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(8)).await;
            host.set_cpu(10.0);
        })
    };

    let started = Instant::now();
    let report = s
        .run_batch(
            (0..4).collect::<Vec<u32>>(),
            OpClass::Standard,
            Some(2),
            |n| {
                if n == 1 {
                    host.set_cpu(91.0);
                }
                async move { Ok::<_, String>(n) }
            },
            &token,
        )
        .await;
    relief.await.expect("relief task");

    assert!(report.stop.is_none(), "stopped: {:?}", report.stop);
    assert_eq!(report.succeeded(), 4);
    assert_eq!(report.batch_sizes, vec![2, 2]);
    assert!(started.elapsed() >= Duration::from_secs(8));
    assert!(started.elapsed() < settings().admission_wait);
}

#[tokio::test(start_paused = true)]
async fn recovery_during_wait_resumes_the_run() {
    // Emergency memory refuses admission; it is re-checked until the host recovers.
    let host = Host::new(96.0);
    let s = scheduler(host.clone(), settings());
    let token = CancellationToken::new();

    let relief = {
        let host = host.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            host.set(40.0);
        })
    };

    let started = Instant::now();
    let report = s
        .run_batch(
            vec!["a", "b", "c"],
            OpClass::Standard,
            None,
            |item| async move { Ok::<_, String>(item.len()) },
            &token,
        )
        .await;
    relief.await.expect("relief task");

    assert_eq!(report.succeeded(), 3);
    assert!(report.stop.is_none());
    // Pacing was fixed at the start of the run, when the host was in emergency.
    assert_eq!(report.batch_sizes, vec![1, 1, 1]);
    assert!(started.elapsed() >= Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn emergency_level_pacing_is_applied() {
    let host = Host::new(96.0);
    let lenient = ThresholdSet {
        memory_warning: 98.0,
        memory_critical: 99.0,
        ..ThresholdSet::default()
    };
    let s = scheduler_with(host, lenient, settings());
    let token = CancellationToken::new();
    let profile = ProfileTable::default().emergency;

    let started = Instant::now();
    let report = s
        .run_batch(
            (0..12).collect::<Vec<u32>>(),
            OpClass::Read,
            Some(100),
            |n| async move { Ok::<_, String>(n) },
            &token,
        )
        .await;

    assert!(report.batch_sizes.iter().all(|&size| size <= profile.batch_size));
    assert_eq!(report.batch_sizes.iter().sum::<usize>(), 12);
    assert_eq!(report.pauses, report.batch_sizes.len() - 1);
    let paused = profile.pause_between_batches * u32::try_from(report.pauses).expect("pauses");
    assert!(started.elapsed() >= paused);
    // 96% is above the emergency cooldown threshold.
    assert_eq!(report.cooldowns, 2);
}

#[tokio::test(start_paused = true)]
async fn timed_out_items_do_not_stop_the_run() {
    let host = Host::new(30.0);
    let s = scheduler(
        host,
        SchedulerSettings {
            item_timeout: Duration::from_secs(2),
            ..settings()
        },
    );
    let token = CancellationToken::new();

    let report = s
        .run_batch(
            vec![1_u64, 5, 1],
            OpClass::Standard,
            None,
            |secs| async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                Ok::<_, String>(secs)
            },
            &token,
        )
        .await;

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(
        report.outcomes[1],
        ItemOutcome::Failed(ItemError::TimedOut {
            after: Duration::from_secs(2)
        })
    );
    assert_eq!(report.succeeded(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancelling_mid_run_returns_prefix() {
    let host = Host::new(30.0);
    let s = scheduler(host, settings());
    let token = CancellationToken::new();
    let trigger = token.clone();

    let report = s
        .run_batch(
            (0..10).collect::<Vec<u32>>(),
            OpClass::Standard,
            Some(4),
            |n| {
                if n == 5 {
                    trigger.cancel();
                }
                async move { Ok::<_, String>(n) }
            },
            &token,
        )
        .await;

    assert_eq!(report.stop, Some(StopReason::Interrupted));
    assert!(report.outcomes.len() <= 6);
    assert!(report.outcomes.iter().all(ItemOutcome::is_success));
}
