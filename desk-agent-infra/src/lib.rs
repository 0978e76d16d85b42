pub mod infra;

pub use infra::agent_store::{AgentStore, AgentStoreError};
