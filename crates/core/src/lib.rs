//! Shared building blocks for desk-agent: the configuration value object
//! and small display helpers used across crates.

pub mod config;
pub mod display;

pub use config::{
    AgentConfig, AutomationSettings, ConfigError, Limits, LlmSettings, PathSettings,
    SecuritySettings, ServerSettings,
};
