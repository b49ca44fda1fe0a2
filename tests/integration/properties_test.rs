#![allow(clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rand::Rng;

use warden::application::services::timeout::{run_with_timeout, ScopedTimeout, TimeoutError};
use warden::domain::entities::batch::split_batches;
use warden::domain::entities::snapshot::Snapshot;
use warden::domain::entities::window::SnapshotWindow;
use warden::domain::policy::degradation::{adapt_parameters, level_for, OperationParameters};
use warden::domain::rules::memory_trend::MemoryTrendAnalyzer;
use warden::domain::rules::Analyzer;
use warden::domain::value_objects::operation_profile::ProfileTable;
use warden::domain::value_objects::performance_level::PerformanceLevel;
use warden::domain::value_objects::severity::Severity;
use warden::domain::value_objects::thresholds::ThresholdSet;
use warden::domain::value_objects::trend_settings::TrendSettings;

fn snapshot(memory: f64, cpu: f64, processes: usize) -> Snapshot {
    Snapshot {
        timestamp: Utc::now(),
        memory_percent: memory,
        memory_available_bytes: 1,
        cpu_percent: cpu,
        disk_percent: 10.0,
        disk_free_bytes: 1,
        matched_process_count: processes,
        matched_process_memory_mb: 0,
    }
}

fn any_level() -> impl Strategy<Value = PerformanceLevel> {
    prop_oneof![
        Just(PerformanceLevel::Optimal),
        Just(PerformanceLevel::Reduced),
        Just(PerformanceLevel::Minimal),
        Just(PerformanceLevel::Emergency),
    ]
}

fn any_parameters() -> impl Strategy<Value = OperationParameters> {
    (1_usize..500, 0_u64..30_000, 1_usize..50_000, 1_u64..1_000).prop_map(
        |(batch_size, pause_ms, max_output_lines, max_file_size_mb)| OperationParameters {
            batch_size,
            pause: Duration::from_millis(pause_ms),
            max_output_lines,
            max_file_size_mb,
        },
    )
}

proptest! {
    #[test]
    fn more_pressure_never_improves_the_level(
        memory in 0.0_f64..100.0,
        extra_memory in 0.0_f64..20.0,
        cpu in 0.0_f64..100.0,
        extra_cpu in 0.0_f64..20.0,
        processes in 0_usize..12,
        extra_processes in 0_usize..4,
    ) {
        let calm = level_for(&snapshot(memory, cpu, processes));
        let pressed = level_for(&snapshot(
            memory + extra_memory,
            cpu + extra_cpu,
            processes + extra_processes,
        ));
        prop_assert!(calm.satisfies(pressed));
    }

    #[test]
    fn level_is_a_function_of_the_snapshot(
        memory in 0.0_f64..100.0,
        cpu in 0.0_f64..100.0,
        processes in 0_usize..12,
    ) {
        let s = snapshot(memory, cpu, processes);
        prop_assert_eq!(level_for(&s), level_for(&s.clone()));
    }

    #[test]
    fn adapting_is_idempotent_and_only_tightens(
        requested in any_parameters(),
        level in any_level(),
    ) {
        let table = ProfileTable::default();
        let profile = table.get(level);
        let once = adapt_parameters(&requested, profile);
        let twice = adapt_parameters(&once, profile);

        prop_assert_eq!(&once, &twice);
        prop_assert!(once.batch_size <= requested.batch_size);
        prop_assert!(once.batch_size <= profile.batch_size);
        prop_assert!(once.pause >= requested.pause);
        prop_assert!(once.pause >= profile.pause_between_batches);
        prop_assert!(once.max_output_lines <= requested.max_output_lines);
        prop_assert!(once.max_file_size_mb <= requested.max_file_size_mb);
    }

    #[test]
    fn splitting_preserves_items_and_order(
        items in proptest::collection::vec(any::<u16>(), 0..200),
        batch_size in 0_usize..40,
    ) {
        let batches = split_batches(items.clone(), batch_size);
        let size = batch_size.max(1);

        prop_assert_eq!(batches.len(), items.len().div_ceil(size));
        if let Some((last, full)) = batches.split_last() {
            prop_assert!(full.iter().all(|b| b.len() == size));
            prop_assert!(!last.is_empty() && last.len() <= size);
        }
        let flattened: Vec<u16> = batches.into_iter().flatten().collect();
        prop_assert_eq!(flattened, items);
    }

    #[test]
    fn memory_trend_fires_only_for_fast_near_growth(
        base in 20.0_f64..70.0,
        slope in 0.0_f64..8.0,
        samples in 3_usize..12,
    ) {
        let settings = TrendSettings::default();
        let step_minutes = 0.5;
        #[allow(clippy::cast_precision_loss)]
        let span = step_minutes * (samples - 1) as f64;
        let last = base + slope * span;
        prop_assume!(last <= 100.0);

        let minutes = if slope > 0.0 {
            ((settings.projection_target_percent - last) / slope).max(0.0)
        } else {
            f64::INFINITY
        };
        // Stay clear of the boundaries where rounding decides.
        prop_assume!((slope - settings.memory_rate_per_minute).abs() > 0.05);
        prop_assume!((minutes - settings.critical_minutes).abs() > 0.05);
        prop_assume!((minutes - settings.emergency_minutes).abs() > 0.05);

        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().expect("start");
        let mut window = SnapshotWindow::new();
        for i in 0..samples {
            let offset = chrono::Duration::seconds(30 * i64::try_from(i).expect("index"));
            #[allow(clippy::cast_precision_loss)]
            let memory = base + slope * step_minutes * i as f64;
            window.push(Snapshot {
                timestamp: start + offset,
                ..snapshot(memory, 10.0, 0)
            });
        }

        let alert = MemoryTrendAnalyzer.analyze(&window, &ThresholdSet::default(), &settings);
        let expected = slope > settings.memory_rate_per_minute && minutes < settings.critical_minutes;
        prop_assert_eq!(alert.is_some(), expected);
        if let Some(alert) = alert {
            let severity = if minutes < settings.emergency_minutes {
                Severity::Emergency
            } else {
                Severity::Critical
            };
            prop_assert_eq!(alert.severity(), severity);
        }
    }
}

// ---------------------------------------------------------------------------
// Randomized timeout scopes
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn every_scope_cancels_its_timer_exactly_once() {
    let cancelled = Arc::new(AtomicUsize::new(0));
    let mut rng = rand::rng();
    let rounds = 200;

    for _ in 0..rounds {
        let counter = cancelled.clone();
        let scope = ScopedTimeout::new(
            Duration::from_millis(rng.random_range(1..50)),
            "randomized",
        )
        .on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        if rng.random_bool(0.5) {
            scope.expired_wait().await;
            assert!(scope.expired());
        }
        drop(scope);
    }

    assert_eq!(cancelled.load(Ordering::SeqCst), rounds);
}

#[tokio::test(start_paused = true)]
async fn timeout_outcome_matches_durations() {
    let mut rng = rand::rng();
    for _ in 0..100 {
        let limit = rng.random_range(20_u64..200);
        let work = loop {
            let candidate = rng.random_range(0_u64..400);
            if candidate.abs_diff(limit) >= 5 {
                break candidate;
            }
        };

        let result: Result<u64, TimeoutError<String>> = run_with_timeout(
            "randomized",
            Duration::from_millis(limit),
            async move {
                tokio::time::sleep(Duration::from_millis(work)).await;
                Ok(work)
            },
        )
        .await;

        if work < limit {
            assert_eq!(result.ok(), Some(work));
        } else {
            assert!(matches!(result, Err(TimeoutError::Exceeded { .. })));
        }
    }
}
