use nix::sys::signal::{self, Signal as NixSignal};
use nix::unistd::Pid;

use crate::domain::ports::process_manager::{ProcessError, ProcessManager, Signal};

/// OS-level process manager using POSIX signals via `nix`.
pub struct OsProcessManager;

impl OsProcessManager {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for OsProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

const fn to_nix_signal(sig: Signal) -> NixSignal {
    match sig {
        Signal::Terminate => NixSignal::SIGTERM,
        Signal::Kill => NixSignal::SIGKILL,
    }
}

fn to_pid(pid: u32) -> Result<Pid, ProcessError> {
    // 0 and 1 address the caller's own group and init.
    if pid <= 1 {
        return Err(ProcessError::SignalFailed(format!("refusing to signal pid {pid}")));
    }
    i32::try_from(pid)
        .map(Pid::from_raw)
        .map_err(|_| ProcessError::SignalFailed(format!("invalid pid: {pid}")))
}

fn map_errno(pid: u32, errno: nix::errno::Errno) -> ProcessError {
    match errno {
        nix::errno::Errno::ESRCH => ProcessError::NotFound(pid),
        nix::errno::Errno::EPERM => ProcessError::PermissionDenied(pid),
        other => ProcessError::SignalFailed(other.to_string()),
    }
}

impl ProcessManager for OsProcessManager {
    fn signal(&self, pid: u32, signal: Signal) -> Result<(), ProcessError> {
        signal::kill(to_pid(pid)?, to_nix_signal(signal)).map_err(|errno| map_errno(pid, errno))
    }

    fn signal_group(&self, pgid: u32, signal: Signal) -> Result<(), ProcessError> {
        signal::killpg(to_pid(pgid)?, to_nix_signal(signal))
            .map_err(|errno| map_errno(pgid, errno))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn to_nix_signal_mapping() {
        assert_eq!(to_nix_signal(Signal::Terminate), NixSignal::SIGTERM);
        assert_eq!(to_nix_signal(Signal::Kill), NixSignal::SIGKILL);
    }

    #[test]
    fn signal_nonexistent_process() {
        let manager = OsProcessManager::new();
        let result = manager.signal(4_194_300, Signal::Terminate);
        assert!(matches!(
            result,
            Err(ProcessError::NotFound(_) | ProcessError::PermissionDenied(_))
        ));
    }

    #[test]
    fn signal_nonexistent_group() {
        let manager = OsProcessManager::new();
        let result = manager.signal_group(4_194_301, Signal::Kill);
        assert!(matches!(
            result,
            Err(ProcessError::NotFound(_) | ProcessError::PermissionDenied(_))
        ));
    }

    #[test]
    fn reserved_pids_are_rejected() {
        let manager = OsProcessManager::new();
        assert!(matches!(
            manager.signal(0, Signal::Terminate),
            Err(ProcessError::SignalFailed(_))
        ));
        assert!(matches!(
            manager.signal_group(1, Signal::Kill),
            Err(ProcessError::SignalFailed(_))
        ));
    }

    #[test]
    fn terminates_a_real_child() {
        let mut child = std::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .expect("spawn sleep");
        let manager = OsProcessManager::new();
        manager
            .signal(child.id(), Signal::Terminate)
            .expect("signal");
        let status = child.wait().expect("wait");
        assert!(!status.success());
    }
}
