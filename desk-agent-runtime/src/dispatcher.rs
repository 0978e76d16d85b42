//! Route a raw input line to exactly one command.

use crate::commands::{CommandContext, CommandRegistry};
use crate::interfaces::CommandError;
use crate::tokenizer::tokenize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to an input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Empty input, or the first word is not a command name.
    Unrecognized,
    /// Missing or malformed arguments; nothing ran.
    Usage(String),
    /// The command ran (or the line could not be parsed).
    Handled { text: String, success: bool },
}

impl DispatchOutcome {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, DispatchOutcome::Unrecognized)
    }
}

pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
    ctx: CommandContext,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>, ctx: CommandContext) -> Self {
        Self { registry, ctx }
    }

    pub fn context(&self) -> &CommandContext {
        &self.ctx
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub async fn dispatch(&self, line: &str) -> DispatchOutcome {
        let words = match tokenize(line) {
            Ok(words) => words,
            Err(e) => {
                warn!("Rejected input line: {}", e);
                return DispatchOutcome::Handled {
                    text: format!("❌ {}", e),
                    success: false,
                };
            }
        };

        let Some((name, args)) = words.split_first() else {
            return DispatchOutcome::Unrecognized;
        };
        let Some(command) = self.registry.get(name) else {
            debug!("'{}' is not a command", name);
            return DispatchOutcome::Unrecognized;
        };

        let spec = command.spec();
        if args.len() < spec.min_args {
            return DispatchOutcome::Usage(format!("Usage: {}", spec.usage));
        }

        info!("Dispatching {} ({} args)", spec.name, args.len());
        match command.run(&self.ctx, args).await {
            Ok(text) => DispatchOutcome::Handled {
                text,
                success: true,
            },
            Err(CommandError::Usage(reason)) => {
                DispatchOutcome::Usage(format!("{}\nUsage: {}", reason, spec.usage))
            }
            Err(CommandError::Failed(reason)) => {
                warn!("{} failed: {}", spec.name, reason);
                DispatchOutcome::Handled {
                    text: format!("❌ {}", reason),
                    success: false,
                }
            }
        }
    }
}
