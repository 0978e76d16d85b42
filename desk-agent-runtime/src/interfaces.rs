//! Error types and the seam between the agent and its language model.

use async_trait::async_trait;
use desk_agent_infra::AgentStoreError;
use desk_agent_tools::OsError;
use thiserror::Error;

/// Runtime errors.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("{0}")]
    LLMError(String),

    #[error("Store error: {0}")]
    StoreError(#[from] AgentStoreError),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Failure of a single command handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Bad or missing arguments; nothing was executed.
    #[error("{0}")]
    Usage(String),

    /// The handler ran and the underlying operation failed.
    #[error("{0}")]
    Failed(String),
}

impl From<OsError> for CommandError {
    fn from(err: OsError) -> Self {
        CommandError::Failed(err.to_string())
    }
}

impl From<AgentStoreError> for CommandError {
    fn from(err: AgentStoreError) -> Self {
        CommandError::Failed(err.to_string())
    }
}

/// Chat completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send `user_message` with the given context lines and return the reply.
    async fn chat(&self, user_message: &str, context: &[String]) -> Result<String, RuntimeError>;

    /// Forget the conversation so far.
    fn clear_history(&self);
}
