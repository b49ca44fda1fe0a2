#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use warden::application::services::subprocess::{CommandSpec, SubprocessError, SubprocessRunner};
use warden::domain::ports::process_manager::{ProcessError, ProcessManager, Signal};
use warden::infrastructure::os::process_manager::OsProcessManager;

// ---------------------------------------------------------------------------
// RecordingManager: forwards to the OS and remembers what was sent
// ---------------------------------------------------------------------------

struct RecordingManager {
    inner: OsProcessManager,
    sent: Mutex<Vec<Signal>>,
}

impl RecordingManager {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: OsProcessManager::new(),
            sent: Mutex::new(vec![]),
        })
    }

    fn sent(&self) -> Vec<Signal> {
        self.sent.lock().expect("lock").clone()
    }
}

impl ProcessManager for RecordingManager {
    fn signal(&self, pid: u32, signal: Signal) -> Result<(), ProcessError> {
        self.sent.lock().expect("lock").push(signal);
        self.inner.signal(pid, signal)
    }

    fn signal_group(&self, pgid: u32, signal: Signal) -> Result<(), ProcessError> {
        self.sent.lock().expect("lock").push(signal);
        self.inner.signal_group(pgid, signal)
    }
}

fn runner(manager: Arc<RecordingManager>, grace: Duration) -> SubprocessRunner {
    SubprocessRunner::new(manager, grace, 64 * 1024)
}

#[tokio::test]
async fn fast_command_is_not_signalled() {
    let manager = RecordingManager::new();
    let outcome = runner(manager.clone(), Duration::from_secs(1))
        .run(&CommandSpec::new("echo").arg("hello"), Duration::from_secs(5))
        .await
        .expect("run");

    assert_eq!(outcome.exit_code, Some(0));
    assert_eq!(outcome.stdout, "hello\n");
    assert!(!outcome.timed_out);
    assert!(manager.sent().is_empty());
}

#[tokio::test]
async fn cooperative_child_stops_on_terminate() {
    let manager = RecordingManager::new();
    let started = Instant::now();
    let outcome = runner(manager.clone(), Duration::from_secs(3))
        .run(&CommandSpec::shell("sleep 30"), Duration::from_millis(300))
        .await
        .expect("run");

    assert!(outcome.timed_out);
    assert!(!outcome.escalated);
    assert_eq!(manager.sent(), vec![Signal::Terminate]);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn stubborn_child_is_killed_after_grace() {
    let manager = RecordingManager::new();
    let grace = Duration::from_millis(500);
    let timeout = Duration::from_millis(300);
    let started = Instant::now();
    let outcome = runner(manager.clone(), grace)
        .run(&CommandSpec::shell("trap '' TERM; sleep 30"), timeout)
        .await
        .expect("run");

    assert!(outcome.timed_out);
    assert!(outcome.escalated);
    assert_eq!(outcome.signal, Some(9));
    assert_eq!(manager.sent(), vec![Signal::Terminate, Signal::Kill]);
    let elapsed = started.elapsed();
    assert!(elapsed >= timeout + grace);
    assert!(elapsed < timeout + grace + Duration::from_secs(2));
}

#[tokio::test]
async fn background_children_die_with_the_group() {
    let manager = RecordingManager::new();
    let started = Instant::now();
    // The shell waits on its own background child; only a group signal ends both.
    let outcome = runner(manager, Duration::from_secs(1))
        .run(&CommandSpec::shell("sleep 30 & wait"), Duration::from_millis(300))
        .await
        .expect("run");

    assert!(outcome.timed_out);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn output_is_capped_but_fully_drained() {
    let manager = RecordingManager::new();
    let outcome = SubprocessRunner::new(manager, Duration::from_secs(1), 1024)
        .run(
            &CommandSpec::shell("head -c 200000 /dev/zero | tr '\\0' 'x'"),
            Duration::from_secs(10),
        )
        .await
        .expect("run");

    assert_eq!(outcome.exit_code, Some(0));
    assert_eq!(outcome.stdout.len(), 1024);
    assert!(!outcome.timed_out);
}

#[tokio::test]
async fn stderr_and_exit_code_are_reported() {
    let manager = RecordingManager::new();
    let outcome = runner(manager, Duration::from_secs(1))
        .run(
            &CommandSpec::shell("echo broken >&2; exit 7"),
            Duration::from_secs(5),
        )
        .await
        .expect("run");

    assert_eq!(outcome.exit_code, Some(7));
    assert_eq!(outcome.stderr.trim(), "broken");
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    let manager = RecordingManager::new();
    let result = runner(manager, Duration::from_secs(1))
        .run(
            &CommandSpec::new("/nonexistent/warden-missing-binary"),
            Duration::from_secs(1),
        )
        .await;

    assert!(matches!(result, Err(SubprocessError::Spawn { .. })));
}
