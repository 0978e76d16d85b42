//! Direct commands: one typed descriptor plus one async handler each.

pub mod archives;
pub mod args;
pub mod automation;
pub mod desktop;
pub mod files;
pub mod memory;
pub mod meta;
pub mod network;
pub mod processes;
pub mod registry;
pub mod security;
pub mod system;
pub mod utilities;

pub use registry::CommandRegistry;

use crate::interfaces::CommandError;
use async_trait::async_trait;
use desk_agent_core::AgentConfig;
use desk_agent_infra::AgentStore;
use desk_agent_tools::PathGuard;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Files,
    Processes,
    System,
    Network,
    Memory,
    Utilities,
    Security,
    Archives,
    Desktop,
    Automation,
    Meta,
}

impl Category {
    pub fn title(self) -> &'static str {
        match self {
            Category::Files => "Files",
            Category::Processes => "Programs and processes",
            Category::System => "System",
            Category::Network => "Network",
            Category::Memory => "Memory and statistics",
            Category::Utilities => "Utilities",
            Category::Security => "Security",
            Category::Archives => "Archives",
            Category::Desktop => "Desktop and media",
            Category::Automation => "Automation",
            Category::Meta => "Help",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Static description of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub name: &'static str,
    pub category: Category,
    /// Arguments required after the command name.
    pub min_args: usize,
    pub usage: &'static str,
    pub summary: &'static str,
}

impl CommandSpec {
    pub const fn new(
        name: &'static str,
        category: Category,
        min_args: usize,
        usage: &'static str,
        summary: &'static str,
    ) -> Self {
        Self {
            name,
            category,
            min_args,
            usage,
            summary,
        }
    }
}

#[async_trait]
pub trait Command: Send + Sync {
    fn spec(&self) -> CommandSpec;

    /// Run with the words after the command name. Arity has already been
    /// checked against `spec().min_args`.
    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError>;
}

/// Shared state handed to every command.
#[derive(Clone)]
pub struct CommandContext {
    pub config: Arc<AgentConfig>,
    pub guard: PathGuard,
    pub store: Arc<AgentStore>,
    pub http: reqwest::Client,
    /// Every registered command, ordered for display.
    pub catalogue: Arc<Vec<CommandSpec>>,
}

impl CommandContext {
    pub fn new(config: Arc<AgentConfig>, store: Arc<AgentStore>, registry: &CommandRegistry) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("desk-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            guard: PathGuard::new(&config.security.forbidden_paths),
            config,
            store,
            http,
            catalogue: Arc::new(registry.specs()),
        }
    }

    /// Record a context entry; failures are logged, never surfaced.
    pub fn remember_context(&self, context_type: &str, content: &str, importance: i64) {
        if let Err(e) = self.store.add_context(context_type, content, None, importance) {
            tracing::warn!("Failed to store context entry: {}", e);
        }
    }
}
