//! `help` and `about`.

use super::args::arg;
use super::{Category, Command, CommandContext, CommandRegistry, CommandSpec};
use crate::interfaces::CommandError;
use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;

pub fn register(registry: &mut CommandRegistry) {
    registry.register(Arc::new(Help)).register(Arc::new(About));
}

/// Every command grouped under its category title.
pub fn catalogue_listing(specs: &[CommandSpec]) -> String {
    let mut out = String::new();
    let mut current: Option<Category> = None;
    for spec in specs {
        if current != Some(spec.category) {
            current = Some(spec.category);
            let _ = writeln!(out, "\n{}:", spec.category);
        }
        let _ = writeln!(out, "  {:<55} {}", spec.usage, spec.summary);
    }
    out.trim().to_string()
}

pub struct Help;

#[async_trait]
impl Command for Help {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "help",
            Category::Meta,
            0,
            "help [command]",
            "List commands, or describe one",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        if args.is_empty() {
            return Ok(format!(
                "📖 Available commands ({}):\n\n{}\n\nAnything else is sent to the language model.",
                ctx.catalogue.len(),
                catalogue_listing(&ctx.catalogue)
            ));
        }

        let name = arg(args, 0).to_lowercase();
        ctx.catalogue
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| {
                format!(
                    "📖 {}\n  Usage: {}\n  Category: {}\n  {}",
                    spec.name, spec.usage, spec.category, spec.summary
                )
            })
            .ok_or_else(|| CommandError::Failed(format!("Unknown command: {}", name)))
    }
}

pub struct About;

#[async_trait]
impl Command for About {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new("about", Category::Meta, 0, "about", "Version and configuration summary")
    }

    async fn run(&self, ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        Ok(format!(
            "🤖 desk-agent {}\n  Commands: {}\n  Model: {}\n  Endpoint: {}\n  Database: {}",
            env!("CARGO_PKG_VERSION"),
            ctx.catalogue.len(),
            ctx.config.llm.model,
            ctx.config.llm.endpoint,
            ctx.config.paths.database().display()
        ))
    }
}
