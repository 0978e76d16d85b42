#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Agent routing between direct commands and the chat model.

use async_trait::async_trait;
use desk_agent_core::AgentConfig;
use desk_agent_infra::AgentStore;
use desk_agent_runtime::*;
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;

/// Model that replays canned answers and records what it was asked.
struct ScriptedModel {
    replies: Mutex<Vec<Result<String, RuntimeError>>>,
    asked: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Result<String, RuntimeError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            asked: Mutex::new(Vec::new()),
        })
    }

    fn asked(&self) -> Vec<(String, Vec<String>)> {
        self.asked.lock().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, user_message: &str, context: &[String]) -> Result<String, RuntimeError> {
        self.asked
            .lock()
            .push((user_message.to_string(), context.to_vec()));
        let mut replies = self.replies.lock();
        if replies.is_empty() {
            return Ok("I have nothing more to say.".to_string());
        }
        replies.remove(0)
    }

    fn clear_history(&self) {
        self.asked.lock().clear();
    }
}

fn agent(model: Arc<ScriptedModel>) -> Agent {
    let config = Arc::new(AgentConfig::default());
    let store = Arc::new(AgentStore::in_memory().unwrap());
    Agent::with_model(config, store, model).unwrap()
}

#[tokio::test]
async fn test_direct_command_skips_model() {
    let model = ScriptedModel::new(vec![]);
    let agent = agent(Arc::clone(&model));

    let reply = agent.handle("calculator 3 * 3").await;
    assert_eq!(reply.source, ReplySource::Direct);
    assert!(reply.success);
    assert!(reply.text.ends_with("= 9"));
    assert!(model.asked().is_empty());

    let history = agent.store().recent_commands(10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].command, "calculator 3 * 3");
    assert!(history[0].success);
}

#[tokio::test]
async fn test_usage_is_direct_failure() {
    let model = ScriptedModel::new(vec![]);
    let agent = agent(Arc::clone(&model));

    let reply = agent.handle("copy_file only_one").await;
    assert_eq!(reply.source, ReplySource::Direct);
    assert!(!reply.success);
    assert!(reply.text.contains("Usage: copy_file"));
    assert!(model.asked().is_empty());
}

#[tokio::test]
async fn test_empty_line_is_not_logged() {
    let model = ScriptedModel::new(vec![]);
    let agent = agent(Arc::clone(&model));

    let reply = agent.handle("   ").await;
    assert!(!reply.success);
    assert_eq!(reply.text, "Empty command");
    assert!(model.asked().is_empty());
    assert!(agent.store().recent_commands(10).unwrap().is_empty());
}

#[tokio::test]
async fn test_free_text_goes_to_model() {
    let model = ScriptedModel::new(vec![Ok("You have plenty of space.".to_string())]);
    let agent = agent(Arc::clone(&model));

    let reply = agent.handle("how much disk space do I have?").await;
    assert_eq!(reply.source, ReplySource::Model);
    assert!(reply.success);
    assert_eq!(reply.text, "You have plenty of space.");

    let asked = model.asked();
    assert_eq!(asked.len(), 1);
    assert_eq!(asked[0].0, "how much disk space do I have?");

    let history = agent.store().recent_commands(10).unwrap();
    assert_eq!(history[0].result, "You have plenty of space.");
}

#[tokio::test]
async fn test_model_marker_is_executed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "buy milk").unwrap();

    let marker = format!(
        "Sure.<|channel|>commentary to=functions.read_file <|message|> {}",
        serde_json::json!({ "path": path.display().to_string() })
    );
    let model = ScriptedModel::new(vec![Ok(marker)]);
    let agent = agent(model);

    let via_model = agent.handle("what is in my notes?").await;
    assert_eq!(via_model.source, ReplySource::Model);
    assert!(via_model.success);

    let direct = agent
        .handle(&format!("read_file {}", path.display()))
        .await;
    assert_eq!(via_model.text, direct.text);
    assert!(direct.text.contains("buy milk"));
}

#[tokio::test]
async fn test_destructive_marker_is_only_acknowledged() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keep.txt");
    std::fs::write(&path, "important").unwrap();

    let marker = format!(
        "to=functions.delete_file <|message|>{}",
        serde_json::json!({ "path": path.display().to_string() })
    );
    let agent = agent(ScriptedModel::new(vec![Ok(marker)]));

    let reply = agent.handle("please tidy up").await;
    assert!(reply.success);
    assert!(reply.text.starts_with("✅ Command 'delete_file' recognized"));
    assert!(path.exists());
}

#[tokio::test]
async fn test_model_failure_is_reported() {
    let model = ScriptedModel::new(vec![Err(RuntimeError::LLMError(
        "Could not connect to the language model server at http://localhost:1234/v1/chat/completions. Make sure it is running.".to_string(),
    ))]);
    let agent = agent(model);

    let reply = agent.handle("hello there").await;
    assert_eq!(reply.source, ReplySource::Model);
    assert!(!reply.success);
    assert!(reply.text.starts_with("❌ Could not connect"));

    let history = agent.store().recent_commands(1).unwrap();
    assert!(!history[0].success);
}

#[tokio::test]
async fn test_context_from_earlier_commands_reaches_model() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plan.txt");
    std::fs::write(&path, "ship it").unwrap();

    let model = ScriptedModel::new(vec![Ok("Noted.".to_string())]);
    let agent = agent(Arc::clone(&model));

    agent.handle(&format!("read_file {}", path.display())).await;
    agent.handle("what did I just read?").await;

    let asked = model.asked();
    assert_eq!(asked.len(), 1);
    assert!(asked[0].1.iter().any(|c| c.contains("plan.txt")), "{:?}", asked[0].1);
}

#[tokio::test]
async fn test_clear_history_reaches_model() {
    let model = ScriptedModel::new(vec![Ok("hi".to_string())]);
    let agent = agent(Arc::clone(&model));
    agent.handle("hello").await;
    assert_eq!(model.asked().len(), 1);

    agent.clear_history();
    assert!(model.asked().is_empty());
}

#[tokio::test]
async fn test_routes_to_model() {
    let agent = agent(ScriptedModel::new(vec![]));
    assert!(agent.routes_to_model("what time is it?"));
    assert!(!agent.routes_to_model("current_time"));
    assert!(!agent.routes_to_model("Read_File notes.txt"));
    assert!(!agent.routes_to_model("read_file \"unterminated"));
    assert!(!agent.routes_to_model(""));
}
