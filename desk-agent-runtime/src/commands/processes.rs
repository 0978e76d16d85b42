//! Program launching and process management.

use super::args::{self, arg};
use super::{Category, Command, CommandContext, CommandRegistry, CommandSpec};
use crate::interfaces::CommandError;
use async_trait::async_trait;
use desk_agent_core::display;
use desk_agent_tools::os_capabilities::process::{self, ProcessSort};
use std::fmt::Write;
use std::sync::Arc;
use tracing::info;

pub fn register(registry: &mut CommandRegistry) {
    registry
        .register(Arc::new(ListPrograms))
        .register(Arc::new(LaunchProgram))
        .register(Arc::new(CloseProgram))
        .register(Arc::new(ListProcesses))
        .register(Arc::new(ProcessInfo))
        .register(Arc::new(KillProcess))
        .register(Arc::new(KillFrozenApps));
}

pub struct ListPrograms;

#[async_trait]
impl Command for ListPrograms {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "list_programs",
            Category::Processes,
            0,
            "list_programs",
            "List installed applications",
        )
    }

    async fn run(&self, _ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let programs = process::list_programs().await?;
        if programs.is_empty() {
            return Ok("📦 No installed programs found".to_string());
        }
        let mut out = format!("📦 {} program(s):\n", programs.len());
        for program in &programs {
            let _ = writeln!(out, "  {}", program.name);
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct LaunchProgram;

#[async_trait]
impl Command for LaunchProgram {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "launch_program",
            Category::Processes,
            1,
            "launch_program <path or name> [args...]",
            "Start a program in the background",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let launched = process::launch_program(&args::rest(args, 0)).await?;
        info!("Launched '{}' (PID {})", launched.command, launched.pid);
        ctx.remember_context(
            "program_launch",
            &format!("Launched: {}", launched.command),
            6,
        );
        Ok(format!(
            "🚀 Launched {} (PID: {})",
            launched.command, launched.pid
        ))
    }
}

pub struct CloseProgram;

#[async_trait]
impl Command for CloseProgram {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "close_program",
            Category::Processes,
            1,
            "close_program <name>",
            "Terminate every process whose name contains the text",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let name = args::rest(args, 0);
        let closed = process::close_program(&name).await?;
        ctx.remember_context("program_close", &format!("Closed: {}", name), 7);
        Ok(format!(
            "🛑 Closed {} process(es): {}",
            closed.len(),
            process::describe_terminated(&closed)
        ))
    }
}

pub struct ListProcesses;

#[async_trait]
impl Command for ListProcesses {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "list_processes",
            Category::Processes,
            0,
            "list_processes [cpu|memory] [limit=20]",
            "Show the busiest processes",
        )
    }

    async fn run(&self, _ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let sort = match args.first() {
            Some(raw) => raw.parse::<ProcessSort>()?,
            None => ProcessSort::default(),
        };
        let limit: usize = args::number_or(args, 1, "limit", 20)?;
        let processes = process::list_processes(sort, limit).await?;

        let mut out = format!("⚙️ Top {} processes:\n", processes.len());
        let _ = writeln!(out, "  {:>7}  {:>6}  {:>10}  NAME", "PID", "CPU%", "MEMORY");
        for p in &processes {
            let _ = writeln!(
                out,
                "  {:>7}  {:>6.1}  {:>10}  {}",
                p.pid,
                p.cpu_usage,
                display::megabytes(p.memory_bytes),
                p.name
            );
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct ProcessInfo;

#[async_trait]
impl Command for ProcessInfo {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "process_info",
            Category::Processes,
            1,
            "process_info <pid|name>",
            "Show details about one process",
        )
    }

    async fn run(&self, _ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let details = process::process_info(arg(args, 0)).await?;
        let path_or_unknown = |path: &Option<std::path::PathBuf>| {
            path.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "unknown".to_string())
        };
        Ok(format!(
            "⚙️ {} (PID: {})\n  Status: {}\n  CPU: {:.1}%\n  Memory: {} ({:.1}%)\n  Executable: {}\n  Working dir: {}\n  Parent: {}\n  Started: {}",
            details.name,
            details.pid,
            details.status,
            details.cpu_usage,
            display::megabytes(details.memory_bytes),
            details.memory_percent,
            path_or_unknown(&details.exe),
            path_or_unknown(&details.cwd),
            details
                .parent
                .map(|pid| pid.to_string())
                .unwrap_or_else(|| "none".to_string()),
            details.started,
        ))
    }
}

pub struct KillProcess;

#[async_trait]
impl Command for KillProcess {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "kill_process",
            Category::Processes,
            1,
            "kill_process <pid>",
            "Terminate a process by PID",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let pid: u32 = args::number(args, 0, "pid")?;
        let killed = process::kill_process(pid).await?;
        info!("Killed {} (PID {})", killed.name, killed.pid);
        ctx.remember_context(
            "process_kill",
            &format!("Killed process: {} (PID: {})", killed.name, killed.pid),
            8,
        );
        Ok(format!("💀 Terminated {} (PID: {})", killed.name, killed.pid))
    }
}

pub struct KillFrozenApps;

#[async_trait]
impl Command for KillFrozenApps {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "kill_frozen_apps",
            Category::Processes,
            0,
            "kill_frozen_apps",
            "Terminate stopped or zombie processes",
        )
    }

    async fn run(&self, _ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let killed = process::kill_frozen().await?;
        if killed.is_empty() {
            return Ok("✅ No frozen applications found".to_string());
        }
        Ok(format!(
            "💀 Terminated {} frozen process(es): {}",
            killed.len(),
            process::describe_terminated(&killed)
        ))
    }
}
