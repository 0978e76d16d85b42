//! The agent facade shared by the REPL and the HTTP server.

use crate::commands::{CommandContext, CommandRegistry};
use crate::dispatcher::{CommandDispatcher, DispatchOutcome};
use crate::interfaces::{ChatModel, RuntimeError};
use crate::llm_client::LLMClient;
use crate::postprocess::ResponsePostProcessor;
use crate::prompt::build_system_prompt;
use crate::tokenizer::tokenize;
use crate::types::{AgentReply, ReplySource};
use desk_agent_core::AgentConfig;
use desk_agent_infra::AgentStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Context entries passed to the model with each free-text request.
pub const CONTEXT_ENTRIES: usize = 5;

pub struct Agent {
    dispatcher: CommandDispatcher,
    model: Arc<dyn ChatModel>,
    postprocessor: ResponsePostProcessor,
    store: Arc<AgentStore>,
}

impl Agent {
    /// Agent backed by the configured chat endpoint.
    pub fn new(config: Arc<AgentConfig>, store: Arc<AgentStore>) -> Result<Self, RuntimeError> {
        let registry = Arc::new(CommandRegistry::with_defaults());
        let os = format!("{} ({})", std::env::consts::OS, std::env::consts::ARCH);
        let prompt = build_system_prompt(&registry, chrono::Local::now(), &os);
        let model = Arc::new(LLMClient::new(
            &config.llm,
            config.limits.max_history_messages,
            prompt,
        ));
        Self::assemble(config, store, registry, model)
    }

    /// Agent with a caller-supplied model backend.
    pub fn with_model(
        config: Arc<AgentConfig>,
        store: Arc<AgentStore>,
        model: Arc<dyn ChatModel>,
    ) -> Result<Self, RuntimeError> {
        let registry = Arc::new(CommandRegistry::with_defaults());
        Self::assemble(config, store, registry, model)
    }

    fn assemble(
        config: Arc<AgentConfig>,
        store: Arc<AgentStore>,
        registry: Arc<CommandRegistry>,
        model: Arc<dyn ChatModel>,
    ) -> Result<Self, RuntimeError> {
        let ctx = CommandContext::new(config, Arc::clone(&store), &registry);
        info!("Agent ready with {} commands", registry.count());
        Ok(Self {
            dispatcher: CommandDispatcher::new(registry, ctx),
            model,
            postprocessor: ResponsePostProcessor::new()?,
            store,
        })
    }

    pub fn store(&self) -> &Arc<AgentStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        self.dispatcher.registry()
    }

    /// Run a line as a direct command only, never consulting the model.
    pub async fn dispatch(&self, line: &str) -> DispatchOutcome {
        self.dispatcher.dispatch(line).await
    }

    /// Whether `line` would be answered by the model rather than a command.
    /// Lines that fail to tokenize are reported directly.
    pub fn routes_to_model(&self, line: &str) -> bool {
        match tokenize(line) {
            Ok(words) => words
                .first()
                .map_or(false, |name| !self.registry().contains(name)),
            Err(_) => false,
        }
    }

    /// Forget the model conversation.
    pub fn clear_history(&self) {
        self.model.clear_history();
    }

    /// Answer one input line: a direct command if it names one, otherwise a
    /// model round-trip. Every non-empty line is logged.
    pub async fn handle(&self, line: &str) -> AgentReply {
        let line = line.trim();
        if line.is_empty() {
            return AgentReply {
                text: "Empty command".to_string(),
                source: ReplySource::Direct,
                success: false,
            };
        }

        let started = Instant::now();
        let reply = match self.dispatcher.dispatch(line).await {
            DispatchOutcome::Handled { text, success } => AgentReply {
                text,
                source: ReplySource::Direct,
                success,
            },
            DispatchOutcome::Usage(text) => AgentReply {
                text,
                source: ReplySource::Direct,
                success: false,
            },
            DispatchOutcome::Unrecognized => self.ask_model(line).await,
        };

        let elapsed = started.elapsed().as_secs_f64();
        if let Err(e) = self
            .store
            .log_command(line, &reply.text, reply.success, elapsed)
        {
            warn!("Failed to log command: {}", e);
        }
        reply
    }

    async fn ask_model(&self, line: &str) -> AgentReply {
        let context: Vec<String> = match self.store.relevant_context(None, CONTEXT_ENTRIES) {
            Ok(entries) => entries.into_iter().map(|e| e.content).collect(),
            Err(e) => {
                warn!("Failed to load context: {}", e);
                Vec::new()
            }
        };

        match self.model.chat(line, &context).await {
            Ok(answer) => {
                let processed = self.postprocessor.process(&answer, &self.dispatcher).await;
                AgentReply {
                    text: processed.text,
                    source: ReplySource::Model,
                    success: processed.success,
                }
            }
            Err(e) => {
                warn!("Language model request failed: {}", e);
                AgentReply {
                    text: format!("❌ {}", e),
                    source: ReplySource::Model,
                    success: false,
                }
            }
        }
    }
}
