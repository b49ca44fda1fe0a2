use std::sync::{Mutex, MutexGuard};

use sysinfo::{Disks, System};

use crate::domain::entities::snapshot::Snapshot;
use crate::domain::ports::collector::{CollectionError, MetricsSource};

const BYTES_PER_MB: u64 = 1_048_576;

/// Filesystem types that never hold user data
const PSEUDO_FILESYSTEMS: &[&str] = &[
    "tmpfs",
    "devtmpfs",
    "sysfs",
    "proc",
    "cgroup2",
    "overlay",
    "squashfs",
    "efivarfs",
    "bpf",
    "hugetlbfs",
    "mqueue",
    "pstore",
    "securityfs",
    "debugfs",
    "tracefs",
    "fusectl",
    "rpc_pipefs",
];

/// Returns `(numerator / denominator) * 100.0`, or `0.0` when `denominator` is zero.
#[allow(clippy::cast_precision_loss)]
fn safe_percent(numerator: u64, denominator: u64) -> f64 {
    if denominator > 0 {
        (numerator as f64 / denominator as f64) * 100.0
    } else {
        0.0
    }
}

/// Returns the arithmetic mean of `per_core` usages, or `0.0` when the slice is empty.
#[allow(clippy::cast_precision_loss)]
fn avg_cpu_usage(per_core: &[f32]) -> f32 {
    let count = per_core.len();
    if count > 0 {
        per_core.iter().sum::<f32>() / count as f32
    } else {
        0.0
    }
}

fn matches_any(haystack: &str, patterns: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    patterns.iter().any(|p| haystack.contains(p.as_str()))
}

/// Host metrics through `sysinfo`.
///
/// `System` needs `&mut self` to refresh while `MetricsSource` takes `&self`,
/// hence the mutex. CPU usage is a delta between refreshes, so the very first
/// reading after construction or `reset` may be low.
pub struct SysinfoCollector {
    sys: Mutex<System>,
    /// Lowercased substrings matched against process names and command lines
    patterns: Vec<String>,
}

impl SysinfoCollector {
    #[must_use]
    pub fn new(patterns: &[String]) -> Self {
        Self {
            sys: Mutex::new(fresh_system()),
            patterns: patterns
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, System>, CollectionError> {
        self.sys
            .lock()
            .map_err(|e| CollectionError::MetricsUnavailable(format!("system lock poisoned: {e}")))
    }

    /// Count and largest resident size (MB) of processes matching the patterns.
    fn matched_processes(&self, sys: &System) -> (usize, u64) {
        if self.patterns.is_empty() {
            return (0, 0);
        }
        let own_pid = std::process::id();
        sys.processes()
            .values()
            .filter(|p| p.pid().as_u32() != own_pid)
            .filter(|p| {
                let name = p.name().to_string_lossy();
                let cmdline = p
                    .cmd()
                    .iter()
                    .map(|s| s.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" ");
                matches_any(&name, &self.patterns) || matches_any(&cmdline, &self.patterns)
            })
            .fold((0, 0), |(count, largest), p| {
                (count + 1, largest.max(p.memory() / BYTES_PER_MB))
            })
    }
}

impl Default for SysinfoCollector {
    fn default() -> Self {
        Self::new(&[])
    }
}

fn fresh_system() -> System {
    let mut sys = System::new_all();
    sys.refresh_all();
    sys
}

/// Usage of the fullest real filesystem as `(percent, free bytes)`.
fn fullest_disk() -> (f64, u64) {
    let disks = Disks::new_with_refreshed_list();
    disks
        .iter()
        .filter(|d| {
            let fs = d.file_system().to_string_lossy();
            !PSEUDO_FILESYSTEMS.iter().any(|&pseudo| fs == pseudo) && d.total_space() > 0
        })
        .map(|d| {
            let total = d.total_space();
            let available = d.available_space();
            let percent = safe_percent(total.saturating_sub(available), total).clamp(0.0, 100.0);
            (percent, available)
        })
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .unwrap_or((0.0, 0))
}

impl MetricsSource for SysinfoCollector {
    fn collect(&self) -> Result<Snapshot, CollectionError> {
        let mut sys = self.lock()?;
        sys.refresh_all();

        let total = sys.total_memory();
        if total == 0 {
            return Err(CollectionError::MetricsUnavailable(
                "total memory reported as zero".to_string(),
            ));
        }
        let available = sys.available_memory();
        let memory_percent = safe_percent(total.saturating_sub(available), total);

        let per_core: Vec<f32> = sys.cpus().iter().map(sysinfo::Cpu::cpu_usage).collect();
        let cpu_percent = f64::from(avg_cpu_usage(&per_core)).clamp(0.0, 100.0);

        let (matched_process_count, matched_process_memory_mb) = self.matched_processes(&sys);
        drop(sys);

        let (disk_percent, disk_free_bytes) = fullest_disk();

        Ok(Snapshot {
            timestamp: chrono::Utc::now(),
            memory_percent,
            memory_available_bytes: available,
            cpu_percent,
            disk_percent,
            disk_free_bytes,
            matched_process_count,
            matched_process_memory_mb,
        })
    }

    fn reset(&self) -> Result<(), CollectionError> {
        *self.lock()? = fresh_system();
        tracing::info!("System metrics source re-initialised");
        Ok(())
    }
}
