//! System telemetry, health reports and cleanup.

use super::args;
use super::{Category, Command, CommandContext, CommandRegistry, CommandSpec};
use crate::interfaces::CommandError;
use async_trait::async_trait;
use desk_agent_core::display;
use desk_agent_infra::infra::agent_store::SystemSample;
use desk_agent_tools::os_capabilities::system::DiskInfo;
use desk_agent_tools::os_capabilities::{monitoring, system};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Seconds between samples taken by `monitor_performance`.
pub const MONITOR_INTERVAL: Duration = Duration::from_secs(2);

pub fn register(registry: &mut CommandRegistry) {
    registry
        .register(Arc::new(SystemInfoCommand))
        .register(Arc::new(CpuInfoCommand))
        .register(Arc::new(MemoryInfoCommand))
        .register(Arc::new(DiskInfoCommand))
        .register(Arc::new(NetworkInfoCommand))
        .register(Arc::new(BatteryInfoCommand))
        .register(Arc::new(SystemReportCommand))
        .register(Arc::new(MonitorPerformance))
        .register(Arc::new(OptimizeMemory))
        .register(Arc::new(AutoCleanup));
}

fn disk_line(disk: &DiskInfo) -> String {
    format!(
        "{} ({}): {} used of {} ({}), {} free",
        disk.mount_point.display(),
        disk.file_system,
        display::gigabytes(disk.used),
        display::gigabytes(disk.total),
        display::percent(disk.percent),
        display::gigabytes(disk.free)
    )
}

pub struct SystemInfoCommand;

#[async_trait]
impl Command for SystemInfoCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "system_info",
            Category::System,
            0,
            "system_info",
            "Operating system, CPU, memory and disk overview",
        )
    }

    async fn run(&self, _ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let info = system::system_info().await?;
        let mut out = format!(
            "💻 {} {} ({})\n  Host: {}\n  Architecture: {}\n  Uptime: {}\n  CPU: {} ({} cores, {})\n  Memory: {} of {} used ({})",
            info.system.platform,
            info.system.release,
            info.system.version,
            info.system.hostname,
            info.system.architecture,
            display::duration_hms(info.system.uptime_secs),
            info.cpu.brand,
            info.cpu.logical_cores,
            display::percent(f64::from(info.cpu.usage_percent)),
            display::gigabytes(info.memory.used),
            display::gigabytes(info.memory.total),
            display::percent(info.memory.percent),
        );
        if let Some(disk) = &info.disk {
            let _ = write!(out, "\n  Disk: {}", disk_line(disk));
        }
        Ok(out)
    }
}

pub struct CpuInfoCommand;

#[async_trait]
impl Command for CpuInfoCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new("cpu_info", Category::System, 0, "cpu_info", "Processor load and frequency")
    }

    async fn run(&self, _ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let cpu = system::cpu_info().await?;
        let mut out = format!(
            "🧮 {}\n  Physical cores: {}\n  Logical cores: {}\n  Frequency: {} MHz\n  Usage: {}\n",
            cpu.brand,
            cpu.physical_cores
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            cpu.logical_cores,
            cpu.frequency_mhz,
            display::percent(f64::from(cpu.usage_percent)),
        );
        for (index, usage) in cpu.per_core_percent.iter().enumerate() {
            let _ = writeln!(out, "    core {}: {}", index, display::percent(f64::from(*usage)));
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct MemoryInfoCommand;

#[async_trait]
impl Command for MemoryInfoCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new("memory_info", Category::System, 0, "memory_info", "RAM and swap usage")
    }

    async fn run(&self, _ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let memory = system::memory_info().await?;
        Ok(format!(
            "🧠 Memory\n  Total: {}\n  Used: {} ({})\n  Available: {}\n  Swap: {} of {}",
            display::gigabytes(memory.total),
            display::gigabytes(memory.used),
            display::percent(memory.percent),
            display::gigabytes(memory.available),
            display::gigabytes(memory.swap_used),
            display::gigabytes(memory.swap_total),
        ))
    }
}

pub struct DiskInfoCommand;

#[async_trait]
impl Command for DiskInfoCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new("disk_info", Category::System, 0, "disk_info", "Usage of every mounted disk")
    }

    async fn run(&self, _ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let disks = system::disk_info().await?;
        if disks.is_empty() {
            return Ok("💾 No disks reported".to_string());
        }
        let mut out = String::from("💾 Disks:\n");
        for disk in &disks {
            let _ = writeln!(out, "  {}", disk_line(disk));
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct NetworkInfoCommand;

#[async_trait]
impl Command for NetworkInfoCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "network_info",
            Category::System,
            0,
            "network_info",
            "Network traffic counters per interface",
        )
    }

    async fn run(&self, _ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let net = system::network_info().await?;
        let mut out = format!(
            "🌐 Network\n  Sent: {} ({} packets)\n  Received: {} ({} packets)\n  Interfaces:\n",
            display::megabytes(net.bytes_sent),
            net.packets_sent,
            display::megabytes(net.bytes_received),
            net.packets_received,
        );
        for iface in &net.interfaces {
            let _ = writeln!(
                out,
                "    {} [{}] rx {} / tx {}",
                iface.name,
                iface.mac_address,
                display::megabytes(iface.received),
                display::megabytes(iface.transmitted)
            );
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct BatteryInfoCommand;

#[async_trait]
impl Command for BatteryInfoCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new("battery_info", Category::System, 0, "battery_info", "Battery charge and state")
    }

    async fn run(&self, _ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let battery = system::battery_info().await?;
        Ok(format!(
            "🔋 {}: {}% ({}), {}",
            battery.name,
            battery.percent,
            battery.status,
            if battery.power_plugged { "plugged in" } else { "on battery" }
        ))
    }
}

pub struct SystemReportCommand;

#[async_trait]
impl Command for SystemReportCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "system_report",
            Category::System,
            0,
            "system_report",
            "Health report with the top processes by CPU",
        )
    }

    async fn run(&self, _ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let report = monitoring::system_report().await?;
        let mut out = format!(
            "📋 System report ({})\n  Status: {}\n  Host: {} ({} {})\n  CPU: {}\n  Memory: {} ({} available)\n  Disk: {} ({} free)\n  Top processes:\n",
            report.generated_at,
            if report.healthy { "✅ healthy" } else { "⚠️ under load" },
            report.system.hostname,
            report.system.platform,
            report.system.release,
            display::percent(report.resources.cpu_percent),
            display::percent(report.resources.memory_percent),
            display::gigabytes(report.memory_available),
            display::percent(report.resources.disk_percent),
            display::gigabytes(report.disk_free),
        );
        for p in &report.top_processes {
            let _ = writeln!(out, "    {:>7} {:>6.1}% {}", p.pid, p.cpu_usage, p.name);
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct MonitorPerformance;

#[async_trait]
impl Command for MonitorPerformance {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "monitor_performance",
            Category::System,
            0,
            "monitor_performance [seconds=60]",
            "Sample resource usage for a while and report averages",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let seconds: u64 = args::number_or(args, 0, "seconds", 60)?;
        if seconds > monitoring::MAX_MONITOR_SECS {
            return Err(CommandError::Usage(format!(
                "seconds must be at most {}",
                monitoring::MAX_MONITOR_SECS
            )));
        }
        info!("Monitoring performance for {}s", seconds);
        let report = monitoring::monitor_performance(seconds, MONITOR_INTERVAL).await?;

        ctx.store.log_system_sample(&SystemSample {
            cpu_percent: report.average.cpu_percent,
            memory_percent: report.average.memory_percent,
            disk_percent: report.average.disk_percent,
            network_sent: report.average.network_sent,
            network_received: report.average.network_received,
        })?;

        let mut out = format!(
            "📈 {} sample(s) over {}s\n  Average CPU: {} (peak {})\n  Average memory: {} (peak {})\n  Disk: {}",
            report.samples,
            report.duration_secs,
            display::percent(report.average.cpu_percent),
            display::percent(report.peak_cpu),
            display::percent(report.average.memory_percent),
            display::percent(report.peak_memory),
            display::percent(report.average.disk_percent),
        );
        for alert in &report.alerts {
            let _ = write!(out, "\n  ⚠️ {}", alert);
        }
        Ok(out)
    }
}

pub struct OptimizeMemory;

#[async_trait]
impl Command for OptimizeMemory {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "optimize_memory",
            Category::System,
            0,
            "optimize_memory",
            "Ask the OS to release cached memory",
        )
    }

    async fn run(&self, _ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let result = system::optimize_memory().await?;
        let freed = if result.freed_bytes > 0 {
            display::megabytes(result.freed_bytes as u64)
        } else {
            "0.00 MB".to_string()
        };
        Ok(format!(
            "🧹 Memory usage {} → {} (freed {})",
            display::percent(result.before_percent),
            display::percent(result.after_percent),
            freed
        ))
    }
}

pub struct AutoCleanup;

#[async_trait]
impl Command for AutoCleanup {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "auto_cleanup",
            Category::System,
            0,
            "auto_cleanup [directory...]",
            "Empty temporary folders (the OS temp dir by default)",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let report = system::auto_cleanup(&ctx.guard, args).await?;
        info!(
            "Cleanup removed {} item(s), {} bytes",
            report.removed_items, report.freed_bytes
        );
        let mut out = format!(
            "🧹 Removed {} item(s), freed {}",
            report.removed_items,
            display::megabytes(report.freed_bytes)
        );
        if !report.errors.is_empty() {
            let _ = write!(out, "\n  {} item(s) could not be removed", report.errors.len());
            for error in report.errors.iter().take(5) {
                let _ = write!(out, "\n    {}", error);
            }
        }
        Ok(out)
    }
}
