//! desk-agent runtime
//!
//! Input lines are tokenized and routed to a direct command when the first
//! word names one. Anything else goes to the language model, whose reply may
//! carry a single function-call marker that is executed for a small
//! allow-list of commands.

pub mod agent;
pub mod commands;
pub mod dispatcher;
pub mod interfaces;
pub mod llm_client;
pub mod postprocess;
pub mod prompt;
pub mod tokenizer;
pub mod types;

pub use agent::Agent;
pub use commands::{Category, Command, CommandContext, CommandRegistry, CommandSpec};
pub use dispatcher::{CommandDispatcher, DispatchOutcome};
pub use interfaces::{ChatModel, CommandError, RuntimeError};
pub use llm_client::LLMClient;
pub use postprocess::{MarkerAction, ProcessedReply, ResponsePostProcessor};
pub use prompt::build_system_prompt;
pub use tokenizer::{tokenize, TokenizeError};
pub use types::{AgentReply, ChatMessage, ReplySource, Role};
