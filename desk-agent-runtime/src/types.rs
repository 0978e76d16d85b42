//! Core type definitions for the desk-agent runtime.

use serde::{Deserialize, Serialize};

/// Message role in conversation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat turn as sent to an OpenAI-compatible endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Where a reply came from.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    /// A recognized command ran directly.
    Direct,
    /// The language model answered (possibly followed by a command).
    Model,
}

/// Final answer for one input line.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AgentReply {
    pub text: String,
    pub source: ReplySource,
    pub success: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        let msg = ChatMessage::assistant("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "hi");
    }

    #[test]
    fn test_reply_source_lowercase() {
        let reply = AgentReply {
            text: "ok".into(),
            source: ReplySource::Direct,
            success: true,
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["source"], "direct");
    }
}
