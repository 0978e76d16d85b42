//! LLM client for an OpenAI-compatible chat completions endpoint.

use crate::interfaces::{ChatModel, RuntimeError};
use crate::types::ChatMessage;
use async_trait::async_trait;
use desk_agent_core::LlmSettings;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// OpenAI-compatible request format
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

/// OpenAI-compatible response format
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Chat client that keeps the running conversation in memory.
pub struct LLMClient {
    endpoint: String,
    client: reqwest::Client,
    model: RwLock<String>,
    temperature: f32,
    max_tokens: u32,
    max_history: usize,
    system_prompt: RwLock<String>,
    history: Mutex<Vec<ChatMessage>>,
}

impl LLMClient {
    /// Create a client from config. `max_history` is the number of past
    /// turns replayed with each request.
    pub fn new(settings: &LlmSettings, max_history: usize, system_prompt: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            endpoint: settings.endpoint.clone(),
            client,
            model: RwLock::new(settings.model.clone()),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            max_history,
            system_prompt: RwLock::new(system_prompt),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn current_model(&self) -> String {
        self.model.read().clone()
    }

    /// Set active model.
    pub fn set_model(&self, model: &str) -> Result<(), RuntimeError> {
        let trimmed = model.trim();
        if trimmed.is_empty() {
            return Err(RuntimeError::LLMError("Model cannot be empty".to_string()));
        }
        *self.model.write() = trimmed.to_string();
        Ok(())
    }

    pub fn set_system_prompt(&self, prompt: String) {
        *self.system_prompt.write() = prompt;
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().clone()
    }

    /// Messages for one request: system prompt, optional context, the last
    /// `max_history` turns, then the new user message.
    pub fn build_messages(&self, user_message: &str, context: &[String]) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(self.system_prompt.read().clone())];

        if !context.is_empty() {
            let lines: Vec<String> = context.iter().map(|c| format!("- {}", c)).collect();
            messages.push(ChatMessage::system(format!(
                "Relevant context:\n{}",
                lines.join("\n")
            )));
        }

        let history = self.history.lock();
        let start = history.len().saturating_sub(self.max_history);
        messages.extend(history[start..].iter().cloned());
        drop(history);

        messages.push(ChatMessage::user(user_message));
        messages
    }

    fn record_turn(&self, user_message: &str, reply: &str) {
        let mut history = self.history.lock();
        history.push(ChatMessage::user(user_message));
        history.push(ChatMessage::assistant(reply));
        let cap = self.max_history.saturating_mul(2);
        if history.len() > cap {
            let excess = history.len() - cap;
            history.drain(..excess);
        }
    }

    async fn call_once(&self, messages: &[ChatMessage]) -> Result<String, RuntimeError> {
        let model = self.current_model();
        let request = ChatRequest {
            model: &model,
            messages,
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            stream: false,
        };

        debug!(
            "POST {} (model {}, {} messages)",
            self.endpoint,
            model,
            messages.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("LLM request failed: {}", e);
                if e.is_timeout() {
                    RuntimeError::LLMError(format!(
                        "The language model server at {} did not answer in time.",
                        self.endpoint
                    ))
                } else {
                    RuntimeError::LLMError(format!(
                        "Could not connect to the language model server at {}. Make sure it is running.",
                        self.endpoint
                    ))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(RuntimeError::LLMError(format!(
                "Language model API error: {} - {}",
                status.as_u16(),
                body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RuntimeError::LLMError(format!("Failed to read response: {}", e)))?;
        debug!("LLM response: {} bytes", body.len());

        parse_reply(&body)
    }
}

/// First choice's content from a chat completions body.
pub fn parse_reply(body: &str) -> Result<String, RuntimeError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| RuntimeError::LLMError(format!("Failed to parse language model response: {}", e)))?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| RuntimeError::LLMError("Language model response has no choices".to_string()))
}

#[async_trait]
impl ChatModel for LLMClient {
    async fn chat(&self, user_message: &str, context: &[String]) -> Result<String, RuntimeError> {
        let messages = self.build_messages(user_message, context);
        let reply = self.call_once(&messages).await?;
        self.record_turn(user_message, &reply);
        Ok(reply)
    }

    fn clear_history(&self) {
        self.history.lock().clear();
        info!("Conversation history cleared");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn client(max_history: usize) -> LLMClient {
        LLMClient::new(&LlmSettings::default(), max_history, "You are a test.".to_string())
    }

    #[test]
    fn test_request_serialization() {
        let messages = vec![ChatMessage::user("hi")];
        let request = ChatRequest {
            model: "openai/gpt-oss-20b",
            messages: &messages,
            temperature: Some(0.7),
            max_tokens: None,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "openai/gpt-oss-20b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_context_message_placement() {
        let llm = client(50);
        let messages = llm.build_messages("hello", &["Read file: a.txt".to_string()]);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "Relevant context:\n- Read file: a.txt");
        assert_eq!(messages[2], ChatMessage::user("hello"));

        assert_eq!(llm.build_messages("hello", &[]).len(), 2);
    }

    #[test]
    fn test_history_is_capped() {
        let llm = client(2);
        for i in 0..5 {
            llm.record_turn(&format!("q{}", i), &format!("a{}", i));
        }
        let history = llm.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "q3");

        let messages = llm.build_messages("next", &[]);
        // system + last two turns + user
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "q4");

        llm.clear_history();
        assert!(llm.history().is_empty());
    }

    #[test]
    fn test_parse_reply() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hi there"}}]}"#;
        assert_eq!(parse_reply(body).unwrap(), "Hi there");
        assert!(parse_reply(r#"{"choices":[]}"#).is_err());
        assert!(parse_reply("not json").is_err());
    }

    #[test]
    fn test_set_model_rejects_empty() {
        let llm = client(5);
        assert!(llm.set_model("  ").is_err());
        llm.set_model("qwen2.5-7b").unwrap();
        assert_eq!(llm.current_model(), "qwen2.5-7b");
    }
}
