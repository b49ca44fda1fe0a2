use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::timeout::ScopedTimeout;
use crate::domain::ports::process_manager::{ProcessManager, Signal};

const DEFAULT_GRACE: Duration = Duration::from_secs(5);
const DEFAULT_OUTPUT_LIMIT: usize = 1024 * 1024;
/// How long to wait for pipes to close once the child has been reaped
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum SubprocessError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait for child: {0}")]
    Wait(#[source] std::io::Error),
}

/// Program plus arguments, run without a shell unless built with `shell`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// `sh -c <script>`
    #[must_use]
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubprocessOutcome {
    /// `None` when the child was ended by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub timed_out: bool,
    /// The child ignored terminate and had to be killed
    pub escalated: bool,
    /// Terminating signal number, if any
    pub signal: Option<i32>,
}

impl SubprocessOutcome {
    #[must_use]
    pub const fn success(&self) -> bool {
        !self.timed_out && matches!(self.exit_code, Some(0))
    }
}

/// Runs external commands under a deadline with terminate-then-kill escalation.
///
/// Each child leads its own process group, so signals reach anything it spawned.
pub struct SubprocessRunner {
    process_manager: Arc<dyn ProcessManager>,
    grace: Duration,
    output_limit: usize,
}

impl SubprocessRunner {
    #[must_use]
    pub fn new(process_manager: Arc<dyn ProcessManager>, grace: Duration, output_limit: usize) -> Self {
        Self {
            process_manager,
            grace,
            output_limit,
        }
    }

    #[must_use]
    pub fn with_defaults(process_manager: Arc<dyn ProcessManager>) -> Self {
        Self::new(process_manager, DEFAULT_GRACE, DEFAULT_OUTPUT_LIMIT)
    }

    #[must_use]
    pub const fn grace(&self) -> Duration {
        self.grace
    }

    /// Launch `spec`, wait up to `timeout`, then terminate, wait `grace`, then
    /// kill. The child is always reaped before returning.
    ///
    /// # Errors
    ///
    /// Returns `SubprocessError` if the command cannot be spawned or waited on.
    /// A timeout is not an error: it is reported through `timed_out`.
    pub async fn run(
        &self,
        spec: &CommandSpec,
        timeout: Duration,
    ) -> Result<SubprocessOutcome, SubprocessError> {
        let started = Instant::now();
        let mut command = tokio::process::Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .process_group(0);
        if let Some(dir) = &spec.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| SubprocessError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        let pid = child.id();
        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(read_capped(out, self.output_limit)));
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(read_capped(err, self.output_limit)));

        let scope = ScopedTimeout::new(timeout, spec.to_string());
        let mut timed_out = false;
        let mut escalated = false;
        let status: ExitStatus = tokio::select! {
            biased;
            status = child.wait() => status.map_err(SubprocessError::Wait)?,
            () = scope.expired_wait() => {
                timed_out = true;
                tracing::warn!("'{spec}' exceeded {timeout:?}, sending terminate");
                self.signal_group(pid, Signal::Terminate);
                if let Ok(status) = tokio::time::timeout(self.grace, child.wait()).await {
                    status.map_err(SubprocessError::Wait)?
                } else {
                    escalated = true;
                    tracing::warn!("'{spec}' ignored terminate for {:?}, killing", self.grace);
                    self.signal_group(pid, Signal::Kill);
                    if let Err(e) = child.start_kill() {
                        tracing::debug!("Direct kill of '{spec}' failed: {e}");
                    }
                    child.wait().await.map_err(SubprocessError::Wait)?
                }
            }
        };
        drop(scope);

        Ok(SubprocessOutcome {
            exit_code: status.code(),
            stdout: drain(stdout).await,
            stderr: drain(stderr).await,
            duration: started.elapsed(),
            timed_out,
            escalated,
            signal: status.signal(),
        })
    }

    fn signal_group(&self, pid: Option<u32>, signal: Signal) {
        let Some(pid) = pid else {
            return;
        };
        if let Err(e) = self.process_manager.signal_group(pid, signal) {
            tracing::debug!("Signal {signal:?} to group {pid} failed: {e}");
        }
    }
}

async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> String {
    let mut captured = Vec::new();
    let mut truncated = false;
    let mut chunk = [0_u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            // Keep draining past the limit so the child never blocks on a full pipe.
            Ok(n) => {
                let room = limit.saturating_sub(captured.len());
                truncated |= n > room;
                captured.extend_from_slice(&chunk[..n.min(room)]);
            }
            Err(e) => {
                tracing::debug!("Output read failed: {e}");
                break;
            }
        }
    }
    capped_text(captured, truncated)
}

/// Decodes captured output. A cut at the limit that lands inside a
/// multi-byte character drops the partial character.
fn capped_text(mut captured: Vec<u8>, truncated: bool) -> String {
    if truncated {
        if let Err(e) = std::str::from_utf8(&captured) {
            if e.error_len().is_none() {
                captured.truncate(e.valid_up_to());
            }
        }
    }
    String::from_utf8_lossy(&captured).into_owned()
}

async fn drain(handle: Option<JoinHandle<String>>) -> String {
    let Some(mut handle) = handle else {
        return String::new();
    };
    match tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, &mut handle).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            tracing::debug!("Output reader failed: {e}");
            String::new()
        }
        Err(_) => {
            // A descendant outside the group still holds the pipe open.
            handle.abort();
            String::new()
        }
    }
}
