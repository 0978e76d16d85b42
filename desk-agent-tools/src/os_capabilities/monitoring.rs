//! Sampling, health reports and log analysis.

use super::process::{self, ProcessSort, ProcessSummary};
use super::system::{self, PlatformInfo, ResourceSnapshot};
use super::{blocking, not_found, OsError, OsResult};
use crate::sandbox::PathGuard;
use desk_agent_core::display;
use serde::Serialize;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CPU_ALERT_PERCENT: f64 = 80.0;
pub const MEMORY_ALERT_PERCENT: f64 = 85.0;
const RECENT_ERRORS_SHOWN: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub duration_secs: u64,
    pub samples: usize,
    pub average: ResourceSnapshot,
    pub peak_cpu: f64,
    pub peak_memory: f64,
    pub alerts: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemReport {
    pub generated_at: String,
    pub system: PlatformInfo,
    pub resources: ResourceSnapshot,
    pub memory_available: u64,
    pub disk_free: u64,
    pub top_processes: Vec<ProcessSummary>,
    pub healthy: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LogAnalysis {
    pub files_analyzed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info_messages: usize,
    pub recent_errors: Vec<String>,
}

/// Longest monitoring run accepted, in seconds.
pub const MAX_MONITOR_SECS: u64 = 3600;

/// Sample resources every `interval` for `duration_secs` and average them.
/// At least one sample is always taken.
pub async fn monitor_performance(duration_secs: u64, interval: Duration) -> OsResult<PerformanceReport> {
    if duration_secs > MAX_MONITOR_SECS {
        return Err(OsError::InvalidArgument(format!(
            "monitoring is limited to {} seconds",
            MAX_MONITOR_SECS
        )));
    }
    let interval_secs = interval.as_secs().max(1);
    let count = (duration_secs / interval_secs).max(1);

    let mut sums = (0.0, 0.0, 0.0);
    let mut peak_cpu: f64 = 0.0;
    let mut peak_memory: f64 = 0.0;
    let mut last: Option<ResourceSnapshot> = None;
    for index in 0..count {
        let started = tokio::time::Instant::now();
        let sample = system::resource_snapshot().await?;
        sums.0 += sample.cpu_percent;
        sums.1 += sample.memory_percent;
        sums.2 += sample.disk_percent;
        peak_cpu = peak_cpu.max(sample.cpu_percent);
        peak_memory = peak_memory.max(sample.memory_percent);
        last = Some(sample);
        if index + 1 < count {
            tokio::time::sleep(interval.saturating_sub(started.elapsed())).await;
        }
    }

    let n = count as f64;
    let average = ResourceSnapshot {
        cpu_percent: sums.0 / n,
        memory_percent: sums.1 / n,
        disk_percent: sums.2 / n,
        network_sent: last.as_ref().map(|s| s.network_sent).unwrap_or_default(),
        network_received: last.as_ref().map(|s| s.network_received).unwrap_or_default(),
        timestamp: display::now_timestamp(),
    };

    let mut alerts = Vec::new();
    if average.cpu_percent > CPU_ALERT_PERCENT {
        alerts.push(format!("High CPU load: {:.1}%", average.cpu_percent));
    }
    if average.memory_percent > MEMORY_ALERT_PERCENT {
        alerts.push(format!("High memory usage: {:.1}%", average.memory_percent));
    }

    Ok(PerformanceReport {
        duration_secs,
        samples: count as usize,
        peak_cpu,
        peak_memory,
        average,
        alerts,
    })
}

pub async fn system_report() -> OsResult<SystemReport> {
    let info = system::system_info().await?;
    let resources = system::resource_snapshot().await?;
    let top_processes = process::list_processes(ProcessSort::Cpu, 10).await?;

    Ok(SystemReport {
        generated_at: display::now_timestamp(),
        healthy: resources.cpu_percent < CPU_ALERT_PERCENT
            && resources.memory_percent < MEMORY_ALERT_PERCENT,
        memory_available: info.memory.available,
        disk_free: info.disk.map(|d| d.free).unwrap_or_default(),
        system: info.system,
        resources,
        top_processes,
    })
}

/// Count error, warning and info lines in a log file or in the `*.log` files
/// of a directory.
pub async fn analyze_logs(guard: &PathGuard, path: impl AsRef<Path>) -> OsResult<LogAnalysis> {
    let path = guard.check(path)?;
    if !path.exists() {
        return Err(not_found(&path));
    }

    blocking(move || {
        let files: Vec<PathBuf> = if path.is_dir() {
            std::fs::read_dir(&path)?
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "log"))
                .collect()
        } else {
            vec![path]
        };

        let mut analysis = LogAnalysis {
            files_analyzed: files.len(),
            ..LogAnalysis::default()
        };
        let mut errors = Vec::new();
        for file in &files {
            let Ok(handle) = std::fs::File::open(file) else {
                continue;
            };
            for line in BufReader::new(handle).split(b'\n').map_while(Result::ok) {
                let line = String::from_utf8_lossy(&line);
                let lower = line.to_lowercase();
                if lower.contains("error") || lower.contains("exception") {
                    analysis.errors += 1;
                    errors.push(line.trim().to_string());
                } else if lower.contains("warn") {
                    analysis.warnings += 1;
                } else if lower.contains("info") {
                    analysis.info_messages += 1;
                }
            }
        }

        let skip = errors.len().saturating_sub(RECENT_ERRORS_SHOWN);
        analysis.recent_errors = errors.into_iter().skip(skip).collect();
        Ok(analysis)
    })
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_analyze_logs_counts_levels() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("app.log"),
            "INFO started\nWARN slow disk\nERROR boom 1\nunhandled Exception\nINFO done\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ERROR ignored\n").unwrap();

        let guard = PathGuard::new(["/proc"]);
        let analysis = analyze_logs(&guard, dir.path()).await.unwrap();
        assert_eq!(analysis.files_analyzed, 1);
        assert_eq!(analysis.errors, 2);
        assert_eq!(analysis.warnings, 1);
        assert_eq!(analysis.info_messages, 2);
        assert_eq!(analysis.recent_errors.last().unwrap(), "unhandled Exception");
    }

    #[tokio::test]
    async fn test_analyze_logs_keeps_last_five_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let body: String = (1..=8).map(|i| format!("error #{}\n", i)).collect();
        std::fs::write(dir.path().join("x.log"), body).unwrap();

        let guard = PathGuard::new(["/proc"]);
        let analysis = analyze_logs(&guard, dir.path().join("x.log")).await.unwrap();
        assert_eq!(analysis.errors, 8);
        assert_eq!(analysis.recent_errors.len(), 5);
        assert_eq!(analysis.recent_errors[0], "error #4");
    }

    #[tokio::test]
    async fn test_short_monitor_takes_one_sample() {
        let report = monitor_performance(0, Duration::from_secs(2)).await.unwrap();
        assert_eq!(report.samples, 1);
        assert!(report.peak_cpu >= 0.0);
    }

    #[tokio::test]
    async fn test_monitor_rejects_overlong_runs() {
        let err = monitor_performance(u64::MAX, Duration::from_secs(2)).await.unwrap_err();
        assert!(matches!(err, OsError::InvalidArgument(_)));
    }
}
