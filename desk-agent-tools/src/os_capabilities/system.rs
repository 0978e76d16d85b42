//! System telemetry - platform, CPU, memory, disks, network and battery

use super::{blocking, OsError, OsResult};
use crate::sandbox::PathGuard;
use desk_agent_core::display;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::{Disks, Networks, System};
use tokio::fs;

#[derive(Debug, Clone, Serialize)]
pub struct PlatformInfo {
    pub platform: String,
    pub release: String,
    pub version: String,
    pub architecture: String,
    pub hostname: String,
    pub boot_time: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuInfo {
    pub brand: String,
    pub physical_cores: Option<usize>,
    pub logical_cores: usize,
    pub frequency_mhz: u64,
    pub usage_percent: f32,
    pub per_core_percent: Vec<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryInfo {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub percent: f64,
    pub swap_total: u64,
    pub swap_used: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskInfo {
    pub device: String,
    pub mount_point: PathBuf,
    pub file_system: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
    pub removable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterfaceInfo {
    pub name: String,
    pub mac_address: String,
    pub received: u64,
    pub transmitted: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkInfo {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub interfaces: Vec<InterfaceInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatteryInfo {
    pub name: String,
    pub percent: u8,
    pub status: String,
    pub power_plugged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub system: PlatformInfo,
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub disk: Option<DiskInfo>,
}

/// Point-in-time resource usage, as persisted by performance monitoring and
/// pushed over the stats websocket.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceSnapshot {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub network_sent: u64,
    pub network_received: u64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryOptimization {
    pub before_percent: f64,
    pub after_percent: f64,
    pub freed_bytes: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub removed_items: usize,
    pub freed_bytes: u64,
    pub errors: Vec<String>,
}

fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn sampled_cpu(system: &mut System) {
    system.refresh_cpu();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    system.refresh_cpu();
}

fn platform_info() -> PlatformInfo {
    let boot = System::boot_time();
    PlatformInfo {
        platform: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
        release: System::kernel_version().unwrap_or_default(),
        version: System::long_os_version()
            .or_else(System::os_version)
            .unwrap_or_default(),
        architecture: std::env::consts::ARCH.to_string(),
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        boot_time: chrono::DateTime::from_timestamp(boot as i64, 0)
            .map(|utc| {
                utc.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_default(),
        uptime_secs: System::uptime(),
    }
}

fn cpu_from(system: &System) -> CpuInfo {
    let cpus = system.cpus();
    CpuInfo {
        brand: cpus
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .unwrap_or_default(),
        physical_cores: system.physical_core_count(),
        logical_cores: cpus.len(),
        frequency_mhz: cpus.first().map(|cpu| cpu.frequency()).unwrap_or_default(),
        usage_percent: system.global_cpu_info().cpu_usage(),
        per_core_percent: cpus.iter().map(|cpu| cpu.cpu_usage()).collect(),
    }
}

fn memory_from(system: &System) -> MemoryInfo {
    MemoryInfo {
        total: system.total_memory(),
        used: system.used_memory(),
        available: system.available_memory(),
        percent: percent_of(system.used_memory(), system.total_memory()),
        swap_total: system.total_swap(),
        swap_used: system.used_swap(),
    }
}

fn disks_now() -> Vec<DiskInfo> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .map(|disk| {
            let total = disk.total_space();
            let free = disk.available_space();
            let used = total.saturating_sub(free);
            DiskInfo {
                device: disk.name().to_string_lossy().to_string(),
                mount_point: disk.mount_point().to_path_buf(),
                file_system: disk.file_system().to_string_lossy().to_string(),
                total,
                used,
                free,
                percent: percent_of(used, total),
                removable: disk.is_removable(),
            }
        })
        .collect()
}

/// The disk holding `/` (or `C:\`), falling back to the largest one.
fn system_disk(disks: Vec<DiskInfo>) -> Option<DiskInfo> {
    let root = if cfg!(windows) { Path::new("C:\\") } else { Path::new("/") };
    let mut disks = disks;
    if let Some(index) = disks.iter().position(|d| d.mount_point == root) {
        return Some(disks.swap_remove(index));
    }
    disks.into_iter().max_by_key(|d| d.total)
}

fn network_now() -> NetworkInfo {
    let networks = Networks::new_with_refreshed_list();
    let mut interfaces: Vec<InterfaceInfo> = networks
        .list()
        .iter()
        .map(|(name, data)| InterfaceInfo {
            name: name.clone(),
            mac_address: data.mac_address().to_string(),
            received: data.total_received(),
            transmitted: data.total_transmitted(),
        })
        .collect();
    interfaces.sort_by(|a, b| a.name.cmp(&b.name));

    let data = networks.list().values();
    NetworkInfo {
        bytes_sent: data.clone().map(|d| d.total_transmitted()).sum(),
        bytes_received: data.clone().map(|d| d.total_received()).sum(),
        packets_sent: data.clone().map(|d| d.total_packets_transmitted()).sum(),
        packets_received: data.map(|d| d.total_packets_received()).sum(),
        interfaces,
    }
}

pub async fn system_info() -> OsResult<SystemInfo> {
    blocking(|| {
        let mut system = System::new();
        system.refresh_memory();
        sampled_cpu(&mut system);
        Ok(SystemInfo {
            system: platform_info(),
            cpu: cpu_from(&system),
            memory: memory_from(&system),
            disk: system_disk(disks_now()),
        })
    })
    .await
}

pub async fn cpu_info() -> OsResult<CpuInfo> {
    blocking(|| {
        let mut system = System::new();
        sampled_cpu(&mut system);
        Ok(cpu_from(&system))
    })
    .await
}

pub async fn memory_info() -> OsResult<MemoryInfo> {
    blocking(|| {
        let mut system = System::new();
        system.refresh_memory();
        Ok(memory_from(&system))
    })
    .await
}

pub async fn disk_info() -> OsResult<Vec<DiskInfo>> {
    blocking(|| Ok(disks_now())).await
}

pub async fn network_info() -> OsResult<NetworkInfo> {
    blocking(|| Ok(network_now())).await
}

/// Battery state from `/sys/class/power_supply`.
pub async fn battery_info() -> OsResult<BatteryInfo> {
    let power_supply = Path::new("/sys/class/power_supply");
    if !power_supply.exists() {
        return Err(OsError::NotFound("No battery detected".to_string()));
    }

    let mut entries = fs::read_dir(power_supply).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with("BAT") {
            continue;
        }
        let capacity_file = entry.path().join("capacity");
        if !capacity_file.exists() {
            continue;
        }
        let raw = fs::read_to_string(capacity_file).await?;
        let percent = raw
            .trim()
            .parse::<u8>()
            .map_err(|e| OsError::OperationFailed(e.to_string()))?;
        let status = fs::read_to_string(entry.path().join("status"))
            .await
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "Unknown".to_string());

        return Ok(BatteryInfo {
            power_plugged: status != "Discharging",
            name,
            percent,
            status,
        });
    }

    Err(OsError::NotFound("No battery detected".to_string()))
}

/// CPU, memory and system-disk usage plus cumulative network counters.
pub async fn resource_snapshot() -> OsResult<ResourceSnapshot> {
    blocking(|| Ok(snapshot_blocking())).await
}

fn snapshot_blocking() -> ResourceSnapshot {
    let mut system = System::new();
    system.refresh_memory();
    sampled_cpu(&mut system);
    let network = network_now();
    ResourceSnapshot {
        cpu_percent: f64::from(system.global_cpu_info().cpu_usage()),
        memory_percent: percent_of(system.used_memory(), system.total_memory()),
        disk_percent: system_disk(disks_now()).map(|d| d.percent).unwrap_or_default(),
        network_sent: network.bytes_sent,
        network_received: network.bytes_received,
        timestamp: display::now_timestamp(),
    }
}

/// Ask the OS to trim working sets and report memory usage before and after.
pub async fn optimize_memory() -> OsResult<MemoryOptimization> {
    let before = memory_info().await?;

    let trim = if cfg!(windows) {
        super::run_checked("rundll32.exe", &["advapi32.dll,ProcessIdleTasks"]).await
    } else {
        super::run_checked("sync", &[]).await
    };
    if let Err(e) = trim {
        tracing::warn!("Memory trim request failed: {}", e);
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    let after = memory_info().await?;

    Ok(MemoryOptimization {
        before_percent: before.percent,
        after_percent: after.percent,
        freed_bytes: before.used as i64 - after.used as i64,
    })
}

/// Remove everything inside the given temp directories (default: the OS
/// temp dir). Entries that cannot be removed are reported, not fatal.
pub async fn auto_cleanup(guard: &PathGuard, dirs: &[String]) -> OsResult<CleanupReport> {
    let targets: Vec<PathBuf> = if dirs.is_empty() {
        vec![std::env::temp_dir()]
    } else {
        dirs.iter()
            .map(|dir| guard.check(dir))
            .collect::<OsResult<Vec<_>>>()?
    };

    blocking(move || {
        let mut report = CleanupReport::default();
        for dir in targets.iter().filter(|d| d.is_dir()) {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    report.errors.push(format!("{}: {}", dir.display(), e));
                    continue;
                }
            };
            for entry in entries.filter_map(Result::ok) {
                let path = entry.path();
                let size = tree_size(&path);
                let removed = if path.is_dir() {
                    std::fs::remove_dir_all(&path)
                } else {
                    std::fs::remove_file(&path)
                };
                match removed {
                    Ok(()) => {
                        report.removed_items += 1;
                        report.freed_bytes += size;
                    }
                    Err(e) => report.errors.push(format!("{}: {}", path.display(), e)),
                }
            }
        }
        Ok(report)
    })
    .await
}

fn tree_size(path: &Path) -> u64 {
    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter_map(|entry| entry.metadata().ok())
        .filter(|metadata| metadata.is_file())
        .map(|metadata| metadata.len())
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of_zero_total() {
        assert_eq!(percent_of(5, 0), 0.0);
        assert_eq!(percent_of(1, 4), 25.0);
    }

    #[tokio::test]
    async fn test_memory_info_is_consistent() {
        let memory = memory_info().await.unwrap();
        assert!(memory.used <= memory.total);
        assert!((0.0..=100.0).contains(&memory.percent));
    }

    #[tokio::test]
    async fn test_auto_cleanup_empties_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.tmp"), vec![0u8; 100]).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/b.tmp"), vec![0u8; 50]).unwrap();

        let guard = PathGuard::new(["/proc"]);
        let target = dir.path().to_string_lossy().to_string();
        let report = auto_cleanup(&guard, &[target]).await.unwrap();

        assert_eq!(report.removed_items, 2);
        assert_eq!(report.freed_bytes, 150);
        assert!(report.errors.is_empty());
        assert!(dir.path().exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
