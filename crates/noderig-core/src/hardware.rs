//! Host hardware probing and requirement policy.
//!
//! The probe reads CPU, RAM and free-disk facts from the host. It must never
//! fail: any unreadable metric degrades to 0 so the compliance gate always
//! receives well-formed (possibly pessimistic) data.

use serde::Serialize;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Snapshot of probed host hardware. Immutable for the duration of a run
/// and persisted verbatim into the JSON run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HardwareProfile {
    pub cpu_cores: u64,
    pub ram_gb: u64,
    pub free_disk_gb: u64,
}

/// Minimum hardware thresholds for the reference deployment.
///
/// Thresholds never change during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequirementPolicy {
    pub min_cpu_cores: u64,
    pub min_ram_gb: u64,
    pub min_disk_gb: u64,
}

impl Default for RequirementPolicy {
    fn default() -> Self {
        Self {
            min_cpu_cores: 16,
            min_ram_gb: 64,
            min_disk_gb: 500,
        }
    }
}

/// Probe the host and return a [`HardwareProfile`].
///
/// Each metric degrades to 0 on read failure instead of raising an error.
/// No side effects beyond reading `/proc` and invoking `df`.
pub fn probe_hardware(install_mount: &Path) -> HardwareProfile {
    let cpu_cores = std::fs::read_to_string("/proc/cpuinfo")
        .map(|text| parse_cpu_cores(&text))
        .unwrap_or_else(|e| {
            warn!("failed to read /proc/cpuinfo, assuming 0 cores: {}", e);
            0
        });

    let ram_gb = std::fs::read_to_string("/proc/meminfo")
        .map(|text| parse_ram_gb(&text))
        .unwrap_or_else(|e| {
            warn!("failed to read /proc/meminfo, assuming 0 GB RAM: {}", e);
            0
        });

    let free_disk_gb = probe_free_disk_gb(install_mount).unwrap_or_else(|| {
        warn!("failed to probe free disk at {:?}, assuming 0 GB", install_mount);
        0
    });

    let profile = HardwareProfile {
        cpu_cores,
        ram_gb,
        free_disk_gb,
    };
    debug!(?profile, "probed host hardware");
    profile
}

/// Count `processor` entries in `/proc/cpuinfo` text.
pub fn parse_cpu_cores(cpuinfo: &str) -> u64 {
    cpuinfo
        .lines()
        .filter(|line| line.starts_with("processor"))
        .count() as u64
}

/// Extract total RAM in whole GB from `/proc/meminfo` text.
pub fn parse_ram_gb(meminfo: &str) -> u64 {
    meminfo
        .lines()
        .find(|line| line.starts_with("MemTotal:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb / (1024 * 1024))
        .unwrap_or(0)
}

/// Free disk space in whole GB at the mount containing `path`.
///
/// Shells out to `df` (POSIX output, 1K blocks) since std has no statvfs.
fn probe_free_disk_gb(path: &Path) -> Option<u64> {
    // The install dir may not exist yet; fall back to its nearest existing
    // ancestor so a fresh host still reports the right filesystem.
    let target = nearest_existing_ancestor(path);
    let output = Command::new("df")
        .arg("-Pk")
        .arg(&target)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_df_available_gb(&String::from_utf8_lossy(&output.stdout))
}

fn nearest_existing_ancestor(path: &Path) -> std::path::PathBuf {
    let mut current = path;
    loop {
        if current.exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return std::path::PathBuf::from("/"),
        }
    }
}

/// Parse the `Available` column (1K blocks) of POSIX `df -Pk` output.
pub fn parse_df_available_gb(df_output: &str) -> Option<u64> {
    let data_line = df_output.lines().nth(1)?;
    let available_kb: u64 = data_line.split_whitespace().nth(3)?.parse().ok()?;
    Some(available_kb / (1024 * 1024))
}
