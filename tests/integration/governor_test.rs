#![allow(clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use warden::application::config::AppConfig;
use warden::application::services::governor::{Governor, GovernorPorts};
use warden::application::services::subprocess::CommandSpec;
use warden::application::services::timeout::TimeoutError;
use warden::domain::entities::alert::kind;
use warden::domain::entities::snapshot::Snapshot;
use warden::domain::ports::collector::{CollectionError, MetricsSource};
use warden::domain::value_objects::op_class::OpClass;
use warden::domain::value_objects::performance_level::PerformanceLevel;
use warden::domain::value_objects::severity::Severity;
use warden::infrastructure::notifications::log_file::JsonlAlertLog;
use warden::infrastructure::os::process_manager::OsProcessManager;
use warden::infrastructure::persistence::in_memory_status::InMemoryStatusPublisher;

// ---------------------------------------------------------------------------
// DialSource: memory set by the test, clock advancing 30 s per sample
// ---------------------------------------------------------------------------

struct DialSource {
    state: Mutex<(f64, DateTime<Utc>)>,
    offline: Mutex<bool>,
}

impl DialSource {
    fn new(memory: f64) -> Self {
        Self {
            state: Mutex::new((memory, Utc::now() - chrono::Duration::hours(1))),
            offline: Mutex::new(false),
        }
    }

    fn set_memory(&self, memory: f64) {
        self.state.lock().expect("lock").0 = memory;
    }

    fn set_offline(&self, offline: bool) {
        *self.offline.lock().expect("lock") = offline;
    }
}

impl MetricsSource for DialSource {
    fn collect(&self) -> Result<Snapshot, CollectionError> {
        if *self.offline.lock().expect("lock") {
            return Err(CollectionError::MetricsUnavailable("offline".into()));
        }
        let mut state = self.state.lock().expect("lock");
        state.1 += chrono::Duration::seconds(30);
        Ok(Snapshot {
            timestamp: state.1,
            memory_percent: state.0,
            memory_available_bytes: 4_000_000_000,
            cpu_percent: 10.0,
            disk_percent: 40.0,
            disk_free_bytes: 100_000_000_000,
            matched_process_count: 0,
            matched_process_memory_mb: 0,
        })
    }
}

struct Harness {
    governor: Governor,
    source: Arc<DialSource>,
    publisher: Arc<InMemoryStatusPublisher>,
    alert_log: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

fn harness(memory: f64) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let alert_log = dir.path().join("alerts.jsonl");
    let source = Arc::new(DialSource::new(memory));
    let publisher = Arc::new(InMemoryStatusPublisher::new());

    let mut config = AppConfig::default();
    config.supervisor.shell_probe_command = String::new();
    config.scheduler.inter_item_delay_ms = 0;

    let governor = Governor::new(
        GovernorPorts {
            metrics: source.clone(),
            processes: Arc::new(OsProcessManager::new()),
            publisher: publisher.clone(),
            alert_log: Arc::new(JsonlAlertLog::at(&alert_log)),
        },
        &config,
    );
    Harness {
        governor,
        source,
        publisher,
        alert_log,
        _dir: dir,
    }
}

// ---------------------------------------------------------------------------
// Levels and deferral
// ---------------------------------------------------------------------------

#[test]
fn level_follows_memory_pressure() {
    let h = harness(50.0);
    for (memory, expected) in [
        (50.0, PerformanceLevel::Optimal),
        (82.0, PerformanceLevel::Reduced),
        (91.0, PerformanceLevel::Minimal),
        (97.0, PerformanceLevel::Emergency),
        (40.0, PerformanceLevel::Optimal),
    ] {
        h.source.set_memory(memory);
        assert_eq!(h.governor.current_level(), expected, "memory {memory}");
    }
}

#[test]
fn deferral_tightens_as_level_drops() {
    let h = harness(82.0);
    assert!(h.governor.should_defer(OpClass::Bulk).defer);
    assert!(!h.governor.should_defer(OpClass::Standard).defer);

    h.source.set_memory(97.0);
    for class in OpClass::ALL {
        let decision = h.governor.should_defer(class);
        let never_deferred = class.required_level() == PerformanceLevel::Emergency;
        assert_eq!(decision.defer, !never_deferred, "{class}");
    }
}

#[test]
fn missing_metrics_fall_back_to_reduced() {
    let h = harness(50.0);
    h.source.set_offline(true);
    assert_eq!(h.governor.current_level(), PerformanceLevel::Reduced);
    assert!(!h.governor.admit(OpClass::Standard).allowed);
    assert!(h.governor.admit(OpClass::Read).allowed);
}

// ---------------------------------------------------------------------------
// Early warnings
// ---------------------------------------------------------------------------

#[test]
fn memory_ramp_raises_one_emergency_and_logs_it() {
    let h = harness(60.0);
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = delivered.clone();
    h.governor.register_alert_callback(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let mut raised = Vec::new();
    for step in 0..6 {
        h.source.set_memory(60.0 + 3.0 * f64::from(step));
        raised.extend(h.governor.check_early_warnings().expect("check"));
    }

    let trends: Vec<_> = raised
        .iter()
        .filter(|a| a.kind() == kind::MEMORY_TREND)
        .collect();
    assert_eq!(trends.len(), 1, "repeated detections are not raised again");
    assert_eq!(trends[0].severity(), Severity::Emergency);
    assert_eq!(delivered.load(Ordering::SeqCst), raised.len());

    let logged = std::fs::read_to_string(&h.alert_log).expect("alert log");
    assert_eq!(logged.lines().count(), raised.len());
    assert!(logged.contains("memory_trend"));

    assert_eq!(h.governor.clear_all_alerts(), raised.len());
    assert!(h.governor.active_alerts().is_empty());
    assert_eq!(h.governor.alert_history(10).len(), raised.len());
}

#[test]
fn flat_memory_raises_nothing() {
    let h = harness(45.0);
    for _ in 0..6 {
        assert!(h.governor.check_early_warnings().expect("check").is_empty());
    }
}

// ---------------------------------------------------------------------------
// Supervision
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_reflects_components_and_host() {
    let h = harness(50.0);
    let report = h.governor.get_status().await;

    assert_eq!(report.components.len(), 4);
    assert_eq!(report.components.get("early_warning"), Some(&false));
    assert_eq!(report.active_components(), 3);
    let load = report.system_load.as_ref().expect("system load");
    assert_eq!(load.level, PerformanceLevel::Optimal);
    assert!((report.reliability_score - (0.6 * 0.75 + 0.4)).abs() < 1e-9);
    assert_eq!(h.publisher.latest(), Some(report));
}

#[tokio::test]
async fn unhealthy_host_lowers_reliability() {
    let h = harness(93.0);
    let report = h.governor.supervisor().run_cycle().await;
    assert!((report.reliability_score - (0.6 * 0.75 + 0.2)).abs() < 1e-9);
    assert_eq!(h.governor.status_history().len(), 1);
}

#[tokio::test]
async fn start_and_shutdown_background_tasks() {
    let h = harness(50.0);
    h.governor.start();
    assert!(h.governor.is_running());
    tokio::time::sleep(Duration::from_millis(200)).await;
    h.governor.shutdown(Duration::from_secs(2)).await;
    assert!(!h.governor.is_running());
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn batch_through_governor_keeps_input_order() {
    let h = harness(50.0);
    let token = tokio_util::sync::CancellationToken::new();
    let report = h
        .governor
        .run_batch(
            (0..7).collect::<Vec<u32>>(),
            OpClass::Standard,
            Some(3),
            |n| async move {
                if n == 4 {
                    Err(format!("item {n} broke"))
                } else {
                    Ok(n * 10)
                }
            },
            &token,
        )
        .await;

    assert_eq!(report.batch_sizes, vec![3, 3, 1]);
    assert_eq!(report.outcomes.len(), 7);
    let values: Vec<Option<u32>> = report.outcomes.iter().map(|o| o.value().copied()).collect();
    assert_eq!(
        values,
        vec![Some(0), Some(10), Some(20), Some(30), None, Some(50), Some(60)]
    );
    assert!(report.stop.is_none());
}

#[tokio::test]
async fn subprocess_captures_output() {
    let h = harness(50.0);
    let spec = CommandSpec::new("sh").args(["-c", "echo governed; exit 3"]);
    let outcome = h
        .governor
        .run_subprocess_with_timeout(&spec, Duration::from_secs(5))
        .await
        .expect("run");
    assert_eq!(outcome.exit_code, Some(3));
    assert_eq!(outcome.stdout.trim(), "governed");
    assert!(!outcome.timed_out);
}

#[tokio::test]
async fn adaptive_timeout_learns_from_successes() {
    let h = harness(50.0);
    let before = h.governor.adaptive_timeout("probe");
    for _ in 0..3 {
        let result: Result<u8, TimeoutError<String>> = h
            .governor
            .run_adaptive("probe", async { Ok(1) })
            .await;
        assert_eq!(result.ok(), Some(1));
    }
    assert!(h.governor.adaptive_timeout("probe") <= before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bounded_calls_run_on_spawned_tasks() {
    let h = harness(50.0);
    let governor = Arc::new(h.governor);

    let timed = {
        let governor = governor.clone();
        tokio::spawn(async move {
            governor
                .run_with_timeout("spawned", Duration::from_millis(50), async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok::<(), String>(())
                })
                .await
        })
    };
    let command = {
        let governor = governor.clone();
        tokio::spawn(async move {
            governor
                .run_subprocess_with_timeout(&CommandSpec::shell("echo spawned"), Duration::from_secs(5))
                .await
        })
    };

    assert!(timed.await.expect("join").expect_err("timeout").is_timeout());
    let outcome = command.await.expect("join").expect("run");
    assert_eq!(outcome.stdout.trim(), "spawned");
}
