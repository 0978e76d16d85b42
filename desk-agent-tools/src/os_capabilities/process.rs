//! Process management - launch, inspect and terminate processes

use super::{blocking, OsError, OsResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use sysinfo::{Pid, Process, ProcessStatus, Signal, System};
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessSort {
    #[default]
    Cpu,
    Memory,
}

impl FromStr for ProcessSort {
    type Err = OsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(OsError::InvalidArgument(format!(
                "sort must be 'cpu' or 'memory', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgramEntry {
    pub name: String,
    pub location: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct LaunchedProgram {
    pub command: String,
    pub pid: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TerminatedProcess {
    pub pid: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessSummary {
    pub pid: u32,
    pub name: String,
    pub cpu_usage: f32,
    pub memory_bytes: u64,
    pub memory_percent: f32,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessDetails {
    pub pid: u32,
    pub name: String,
    pub status: String,
    pub cpu_usage: f32,
    pub memory_bytes: u64,
    pub memory_percent: f32,
    pub exe: Option<PathBuf>,
    pub cwd: Option<PathBuf>,
    pub parent: Option<u32>,
    pub started: String,
}

/// Refresh processes twice so per-process CPU usage is meaningful.
fn sampled_system() -> System {
    let mut system = System::new();
    system.refresh_memory();
    system.refresh_processes();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    system.refresh_processes();
    system
}

fn memory_percent(system: &System, process: &Process) -> f32 {
    match system.total_memory() {
        0 => 0.0,
        total => (process.memory() as f64 / total as f64 * 100.0) as f32,
    }
}

fn summarize(system: &System, pid: Pid, process: &Process) -> ProcessSummary {
    ProcessSummary {
        pid: pid.as_u32(),
        name: process.name().to_string(),
        cpu_usage: process.cpu_usage(),
        memory_bytes: process.memory(),
        memory_percent: memory_percent(system, process),
        status: process.status().to_string(),
    }
}

fn terminate(pid: Pid, process: &Process) -> bool {
    process
        .kill_with(Signal::Term)
        .unwrap_or_else(|| process.kill())
        || {
            tracing::debug!("SIGTERM refused for {}, forcing", pid);
            process.kill()
        }
}

/// Installed applications for the current platform, sorted by name.
pub async fn list_programs() -> OsResult<Vec<ProgramEntry>> {
    blocking(|| {
        let mut programs = if cfg!(target_os = "macos") {
            scan_programs(&[PathBuf::from("/Applications")], "app", |path| {
                path.file_stem().map(|s| s.to_string_lossy().to_string())
            })
        } else if cfg!(windows) {
            let mut roots = Vec::new();
            if let Some(data) = std::env::var_os("ProgramData") {
                roots.push(PathBuf::from(data).join(r"Microsoft\Windows\Start Menu\Programs"));
            }
            if let Some(app_data) = std::env::var_os("APPDATA") {
                roots.push(PathBuf::from(app_data).join(r"Microsoft\Windows\Start Menu\Programs"));
            }
            scan_programs(&roots, "lnk", |path| {
                path.file_stem().map(|s| s.to_string_lossy().to_string())
            })
        } else {
            let mut roots = vec![
                PathBuf::from("/usr/share/applications"),
                PathBuf::from("/usr/local/share/applications"),
                PathBuf::from("/var/lib/flatpak/exports/share/applications"),
            ];
            if let Some(home) = std::env::var_os("HOME") {
                roots.push(PathBuf::from(home).join(".local/share/applications"));
            }
            scan_programs(&roots, "desktop", desktop_entry_name)
        };

        programs.sort_by_key(|p| p.name.to_lowercase());
        programs.dedup_by(|a, b| a.name == b.name);
        Ok(programs)
    })
    .await
}

fn scan_programs<F>(roots: &[PathBuf], extension: &str, name_of: F) -> Vec<ProgramEntry>
where
    F: Fn(&Path) -> Option<String>,
{
    roots
        .iter()
        .filter(|root| root.is_dir())
        .flat_map(|root| walkdir::WalkDir::new(root).max_depth(3).into_iter())
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .filter_map(|entry| {
            let name = name_of(entry.path())?;
            Some(ProgramEntry {
                name,
                location: entry.into_path(),
            })
        })
        .collect()
}

/// `Name=` from the `[Desktop Entry]` group, skipping hidden entries.
fn desktop_entry_name(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let mut in_entry = false;
    let mut name = None;
    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_entry = line == "[Desktop Entry]";
            continue;
        }
        if !in_entry {
            continue;
        }
        if line == "NoDisplay=true" || line == "Hidden=true" {
            return None;
        }
        if name.is_none() {
            if let Some(value) = line.strip_prefix("Name=") {
                name = Some(value.trim().to_string());
            }
        }
    }
    name
}

/// Run a command line through the platform shell without waiting for it.
pub async fn launch_program(command_line: &str) -> OsResult<LaunchedProgram> {
    let command_line = command_line.trim();
    if command_line.is_empty() {
        return Err(OsError::InvalidArgument(
            "command cannot be empty".to_string(),
        ));
    }

    let mut command = if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.args(["/C", command_line]);
        command
    } else {
        let mut command = Command::new("sh");
        command.args(["-c", command_line]);
        command
    };

    let child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    let pid = child
        .id()
        .ok_or_else(|| OsError::OperationFailed("Failed to get process ID".to_string()))?;
    Ok(LaunchedProgram {
        command: command_line.to_string(),
        pid,
    })
}

/// Terminate every process whose name contains `name`, case-insensitively.
pub async fn close_program(name: &str) -> OsResult<Vec<TerminatedProcess>> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return Err(OsError::InvalidArgument(
            "process name cannot be empty".to_string(),
        ));
    }

    blocking(move || {
        let mut system = System::new();
        system.refresh_processes();
        let own_pid = std::process::id();

        let terminated: Vec<TerminatedProcess> = system
            .processes()
            .iter()
            .filter(|(pid, process)| {
                pid.as_u32() != own_pid && process.name().to_lowercase().contains(&needle)
            })
            .filter(|(pid, process)| terminate(**pid, process))
            .map(|(pid, process)| TerminatedProcess {
                pid: pid.as_u32(),
                name: process.name().to_string(),
            })
            .collect();

        if terminated.is_empty() {
            return Err(OsError::NotFound(format!("no process matching '{}'", needle)));
        }
        Ok(terminated)
    })
    .await
}

pub async fn list_processes(sort: ProcessSort, limit: usize) -> OsResult<Vec<ProcessSummary>> {
    blocking(move || {
        let system = sampled_system();
        let mut processes: Vec<ProcessSummary> = system
            .processes()
            .iter()
            .map(|(pid, process)| summarize(&system, *pid, process))
            .collect();

        match sort {
            ProcessSort::Cpu => processes.sort_by(|a, b| b.cpu_usage.total_cmp(&a.cpu_usage)),
            ProcessSort::Memory => processes.sort_by(|a, b| b.memory_bytes.cmp(&a.memory_bytes)),
        }
        processes.truncate(limit);
        Ok(processes)
    })
    .await
}

/// Look a process up by PID, or by the first name containing `identifier`.
pub async fn process_info(identifier: &str) -> OsResult<ProcessDetails> {
    let identifier = identifier.trim().to_string();

    blocking(move || {
        let system = sampled_system();
        let found = match identifier.parse::<u32>() {
            Ok(pid) => system
                .process(Pid::from_u32(pid))
                .map(|process| (Pid::from_u32(pid), process)),
            Err(_) => {
                let needle = identifier.to_lowercase();
                let mut matches: Vec<(&Pid, &Process)> = system
                    .processes()
                    .iter()
                    .filter(|(_, p)| p.name().to_lowercase().contains(&needle))
                    .collect();
                matches.sort_by_key(|(pid, _)| pid.as_u32());
                matches.first().map(|(pid, process)| (**pid, *process))
            }
        };

        let (pid, process) =
            found.ok_or_else(|| OsError::NotFound(format!("process '{}'", identifier)))?;

        let started = chrono::DateTime::from_timestamp(process.start_time() as i64, 0)
            .map(|utc| utc.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();

        Ok(ProcessDetails {
            pid: pid.as_u32(),
            name: process.name().to_string(),
            status: process.status().to_string(),
            cpu_usage: process.cpu_usage(),
            memory_bytes: process.memory(),
            memory_percent: memory_percent(&system, process),
            exe: process.exe().map(Path::to_path_buf),
            cwd: process.cwd().map(Path::to_path_buf),
            parent: process.parent().map(|p| p.as_u32()),
            started,
        })
    })
    .await
}

/// Forcefully kill one process.
pub async fn kill_process(pid: u32) -> OsResult<TerminatedProcess> {
    blocking(move || {
        let mut system = System::new();
        system.refresh_processes();
        let process = system
            .process(Pid::from_u32(pid))
            .ok_or_else(|| OsError::NotFound(format!("no process with PID {}", pid)))?;

        if !process.kill() {
            return Err(OsError::OperationFailed(format!(
                "could not kill PID {}",
                pid
            )));
        }
        Ok(TerminatedProcess {
            pid,
            name: process.name().to_string(),
        })
    })
    .await
}

/// Terminate processes reported as stopped or zombie. Sleeping processes are
/// left alone.
pub async fn kill_frozen() -> OsResult<Vec<TerminatedProcess>> {
    blocking(|| {
        let mut system = System::new();
        system.refresh_processes();

        let killed = system
            .processes()
            .iter()
            .filter(|(_, p)| matches!(p.status(), ProcessStatus::Stop | ProcessStatus::Zombie))
            .filter(|(_, p)| p.kill())
            .map(|(pid, p)| TerminatedProcess {
                pid: pid.as_u32(),
                name: p.name().to_string(),
            })
            .collect::<Vec<_>>();

        if !killed.is_empty() {
            tracing::info!("Terminated {} frozen processes", killed.len());
        }
        Ok(killed)
    })
    .await
}

/// `name (PID: n)` lines for reports.
pub fn describe_terminated(processes: &[TerminatedProcess]) -> String {
    processes
        .iter()
        .map(|p| format!("{} (PID: {})", p.name, p.pid))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parse() {
        assert_eq!("CPU".parse::<ProcessSort>().unwrap(), ProcessSort::Cpu);
        assert_eq!("memory".parse::<ProcessSort>().unwrap(), ProcessSort::Memory);
        assert!("disk".parse::<ProcessSort>().is_err());
    }

    #[test]
    fn test_desktop_entry_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let visible = dir.path().join("editor.desktop");
        std::fs::write(
            &visible,
            "[Desktop Entry]\nType=Application\nName=Text Editor\nName[de]=Editor\n\n[Desktop Action new]\nName=New Window\n",
        )
        .unwrap();
        assert_eq!(desktop_entry_name(&visible).as_deref(), Some("Text Editor"));

        let hidden = dir.path().join("hidden.desktop");
        std::fs::write(&hidden, "[Desktop Entry]\nName=Ghost\nNoDisplay=true\n").unwrap();
        assert_eq!(desktop_entry_name(&hidden), None);
    }

    #[tokio::test]
    async fn test_launch_rejects_empty() {
        assert!(matches!(
            launch_program("   ").await,
            Err(OsError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_own_process_is_listed() {
        let details = process_info(&std::process::id().to_string()).await.unwrap();
        assert_eq!(details.pid, std::process::id());
    }

    #[tokio::test]
    async fn test_kill_unknown_pid() {
        assert!(matches!(
            kill_process(u32::MAX - 7).await,
            Err(OsError::NotFound(_))
        ));
    }
}
