//! Backups, stored schedules, folder watching and log analysis.

use super::args::{self, arg};
use super::{Category, Command, CommandContext, CommandRegistry, CommandSpec};
use crate::interfaces::CommandError;
use async_trait::async_trait;
use desk_agent_core::display;
use desk_agent_tools::os_capabilities::{automation, monitoring};
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub fn register(registry: &mut CommandRegistry) {
    registry
        .register(Arc::new(BackupFiles))
        .register(Arc::new(ScheduleTask))
        .register(Arc::new(ListScheduledTasks))
        .register(Arc::new(WatchDirectory))
        .register(Arc::new(LogAnalyzer));
}

pub struct BackupFiles;

#[async_trait]
impl Command for BackupFiles {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "backup_files",
            Category::Automation,
            2,
            "backup_files <source> <destination>",
            "Copy a file or folder into a timestamped backup folder",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let summary = automation::backup_files(&ctx.guard, arg(args, 0), arg(args, 1)).await?;
        info!(
            "Backed up {} file(s) to {}",
            summary.files_copied,
            summary.backup_dir.display()
        );
        Ok(format!(
            "💾 Backed up {} file(s) ({}) to {}",
            summary.files_copied,
            display::megabytes(summary.bytes),
            summary.backup_dir.display()
        ))
    }
}

pub struct ScheduleTask;

#[async_trait]
impl Command for ScheduleTask {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "schedule_task",
            Category::Automation,
            4,
            "schedule_task <name> <command> <time> <type>",
            "Store a task schedule (not executed automatically)",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let id = ctx
            .store
            .add_scheduled_task(arg(args, 0), arg(args, 1), arg(args, 2), arg(args, 3))?;
        Ok(format!(
            "📅 Scheduled task #{} '{}': {} at {} ({})",
            id,
            arg(args, 0),
            arg(args, 1),
            arg(args, 2),
            arg(args, 3)
        ))
    }
}

pub struct ListScheduledTasks;

#[async_trait]
impl Command for ListScheduledTasks {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "list_scheduled_tasks",
            Category::Automation,
            0,
            "list_scheduled_tasks",
            "Show stored task schedules",
        )
    }

    async fn run(&self, ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let tasks = ctx.store.scheduled_tasks()?;
        if tasks.is_empty() {
            return Ok("📅 No scheduled tasks".to_string());
        }
        let mut out = format!("📅 {} scheduled task(s):\n", tasks.len());
        for task in &tasks {
            let _ = writeln!(
                out,
                "  #{} {}: {} at {} ({}), last run: {}",
                task.id,
                task.task_name,
                task.command,
                task.schedule_time,
                task.schedule_type,
                task.last_run.as_deref().unwrap_or("never")
            );
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct WatchDirectory;

#[async_trait]
impl Command for WatchDirectory {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "watch_directory",
            Category::Automation,
            1,
            "watch_directory <directory> [seconds=60]",
            "Report files added, changed or removed over a period",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let seconds: u64 = args::number_or(args, 1, "seconds", 60)?;
        let changes = automation::watch_directory(
            &ctx.guard,
            arg(args, 0),
            Duration::from_secs(seconds),
        )
        .await?;

        if changes.is_empty() {
            return Ok(format!("👀 No changes in {} over {}s", arg(args, 0), seconds));
        }
        let mut out = format!("👀 Changes in {} over {}s:\n", arg(args, 0), seconds);
        for (label, paths) in [
            ("Added", &changes.added),
            ("Modified", &changes.modified),
            ("Deleted", &changes.deleted),
        ] {
            if paths.is_empty() {
                continue;
            }
            let _ = writeln!(out, "  {} ({}):", label, paths.len());
            for path in paths {
                let _ = writeln!(out, "    {}", path.display());
            }
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct LogAnalyzer;

#[async_trait]
impl Command for LogAnalyzer {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "log_analyzer",
            Category::Automation,
            0,
            "log_analyzer [path]",
            "Count errors and warnings in log files",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let path = match args.first() {
            Some(path) => PathBuf::from(path),
            None => ctx.config.paths.logs(),
        };
        let analysis = monitoring::analyze_logs(&ctx.guard, &path).await?;
        let mut out = format!(
            "📑 {} log file(s) in {}\n  Errors: {}\n  Warnings: {}\n  Info: {}",
            analysis.files_analyzed,
            path.display(),
            analysis.errors,
            analysis.warnings,
            analysis.info_messages
        );
        if !analysis.recent_errors.is_empty() {
            out.push_str("\n  Recent errors:");
            for line in &analysis.recent_errors {
                let _ = write!(out, "\n    {}", display::truncate_chars(line, 200));
            }
        }
        Ok(out)
    }
}
