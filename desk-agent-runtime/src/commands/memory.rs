//! Key/value memory, command history and usage statistics.

use super::args::{self, arg};
use super::{Category, Command, CommandContext, CommandRegistry, CommandSpec};
use crate::interfaces::CommandError;
use async_trait::async_trait;
use desk_agent_core::display;
use std::fmt::Write;
use std::sync::Arc;

/// Commands considered by `usage_statistics`.
pub const STATISTICS_WINDOW: usize = 1000;
/// Commands considered by `error_report`.
pub const ERROR_WINDOW: usize = 500;

pub fn register(registry: &mut CommandRegistry) {
    registry
        .register(Arc::new(Remember))
        .register(Arc::new(Recall))
        .register(Arc::new(Forget))
        .register(Arc::new(ShowMemory))
        .register(Arc::new(CommandHistory))
        .register(Arc::new(UsageStatistics))
        .register(Arc::new(ErrorReport))
        .register(Arc::new(ShowContext));
}

pub struct Remember;

#[async_trait]
impl Command for Remember {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "remember",
            Category::Memory,
            2,
            "remember <key> <value...>",
            "Store a value under a key",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let key = arg(args, 0);
        let value = args::rest(args, 1);
        ctx.store.set_preference(key, &value)?;
        Ok(format!("🧠 Remembered: {} = {}", key, value))
    }
}

pub struct Recall;

#[async_trait]
impl Command for Recall {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new("recall", Category::Memory, 1, "recall <key>", "Look up a stored value")
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let key = arg(args, 0);
        Ok(match ctx.store.preference(key)? {
            Some(value) => format!("🧠 {} = {}", key, value),
            None => format!("Nothing remembered for key: {}", key),
        })
    }
}

pub struct Forget;

#[async_trait]
impl Command for Forget {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new("forget", Category::Memory, 1, "forget <key>", "Delete a stored value")
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let key = arg(args, 0);
        if ctx.store.delete_preference(key)? {
            Ok(format!("🧠 Forgot: {}", key))
        } else {
            Ok(format!("Nothing remembered for key: {}", key))
        }
    }
}

pub struct ShowMemory;

#[async_trait]
impl Command for ShowMemory {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new("show_memory", Category::Memory, 0, "show_memory", "List all stored values")
    }

    async fn run(&self, ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let preferences = ctx.store.preferences()?;
        if preferences.is_empty() {
            return Ok("🧠 Memory is empty".to_string());
        }
        let mut out = format!("🧠 {} remembered item(s):\n", preferences.len());
        for pref in &preferences {
            let _ = writeln!(out, "  {} = {} ({})", pref.key, pref.value, pref.updated_date);
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct CommandHistory;

#[async_trait]
impl Command for CommandHistory {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "command_history",
            Category::Memory,
            0,
            "command_history [n=20]",
            "Most recent commands, newest first",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let limit: usize = args::number_or(args, 0, "n", 20)?;
        let records = ctx.store.recent_commands(limit)?;
        if records.is_empty() {
            return Ok("📜 No commands recorded yet".to_string());
        }
        let mut out = format!("📜 Last {} command(s):\n", records.len());
        for record in &records {
            let _ = writeln!(
                out,
                "  {} {} {} ({:.2}s)",
                record.timestamp,
                if record.success { "✅" } else { "❌" },
                record.command,
                record.execution_time
            );
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct UsageStatistics;

#[async_trait]
impl Command for UsageStatistics {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "usage_statistics",
            Category::Memory,
            0,
            "usage_statistics",
            "Success rate and most used commands",
        )
    }

    async fn run(&self, ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let stats = ctx.store.command_stats(STATISTICS_WINDOW)?;
        if stats.total == 0 {
            return Ok("📊 No commands recorded yet".to_string());
        }
        let rate = stats.successes as f64 * 100.0 / stats.total as f64;
        let mut out = format!(
            "📊 Usage over the last {} command(s)\n  Successful: {}\n  Failed: {}\n  Success rate: {}\n  Most used:\n",
            stats.total,
            stats.successes,
            stats.failures,
            display::percent(rate)
        );
        for (name, count) in &stats.top_commands {
            let _ = writeln!(out, "    {}: {}", name, count);
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct ErrorReport;

#[async_trait]
impl Command for ErrorReport {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "error_report",
            Category::Memory,
            0,
            "error_report",
            "Recent failed commands",
        )
    }

    async fn run(&self, ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let failures = ctx.store.recent_failures(ERROR_WINDOW)?;
        if failures.is_empty() {
            return Ok("✅ No errors in recent commands".to_string());
        }
        let mut out = format!("❌ {} failed command(s):\n", failures.len());
        for record in failures.iter().take(20) {
            let _ = writeln!(
                out,
                "  {} {}\n    {}",
                record.timestamp,
                record.command,
                display::truncate_chars(&record.result, 200).replace('\n', " ")
            );
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct ShowContext;

#[async_trait]
impl Command for ShowContext {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "show_context",
            Category::Memory,
            0,
            "show_context [n=10]",
            "Most important context entries",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let limit: usize = args::number_or(args, 0, "n", 10)?;
        let entries = ctx.store.relevant_context(None, limit)?;
        if entries.is_empty() {
            return Ok("🗒️ No context recorded yet".to_string());
        }
        let mut out = format!("🗒️ {} context entr{}:\n", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
        for entry in &entries {
            let _ = writeln!(
                out,
                "  [{}] ({}) {} - {}",
                entry.importance, entry.context_type, entry.content, entry.created_date
            );
        }
        Ok(out.trim_end().to_string())
    }
}
