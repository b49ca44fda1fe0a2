use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type TaskFactory = Box<dyn Fn(CancellationToken) -> TaskFuture + Send + Sync>;

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// A restartable background loop.
///
/// Each start builds a fresh future from the factory and gives it a child of
/// the parent token, so shutting down the parent stops every incarnation.
pub struct ManagedTask {
    name: String,
    parent: CancellationToken,
    factory: TaskFactory,
    running: Mutex<Option<Running>>,
}

impl ManagedTask {
    pub fn new<F, Fut>(name: impl Into<String>, parent: CancellationToken, factory: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name: name.into(),
            parent,
            factory: Box::new(move |token| Box::pin(factory(token))),
            running: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawns the task unless it is already running.
    pub fn start(&self) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return;
        }
        let token = self.parent.child_token();
        let handle = tokio::spawn((self.factory)(token.clone()));
        tracing::debug!("Started task '{}'", self.name);
        *running = Some(Running { token, handle });
    }

    /// Cancels and aborts the current incarnation, then starts a new one.
    pub fn restart(&self) {
        if let Some(previous) = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            previous.token.cancel();
            previous.handle.abort();
        }
        tracing::info!("Restarting task '{}'", self.name);
        self.start();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Cancels the task and waits up to `timeout` for it to exit, aborting it
    /// otherwise. Returns whether it exited on its own.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let Some(Running { token, mut handle }) = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return true;
        };
        token.cancel();
        if tokio::time::timeout(timeout, &mut handle).await.is_ok() {
            true
        } else {
            tracing::warn!("Task '{}' ignored cancellation for {timeout:?}, aborting", self.name);
            handle.abort();
            false
        }
    }
}
