#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! HTTP API against a live listener on an ephemeral port.

use async_trait::async_trait;
use desk_agent_app::server::{router, AppState};
use desk_agent_core::AgentConfig;
use desk_agent_infra::AgentStore;
use desk_agent_runtime::{Agent, ChatModel, RuntimeError};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

struct EchoModel {
    asked: Mutex<Vec<String>>,
}

#[async_trait]
impl ChatModel for EchoModel {
    async fn chat(&self, user_message: &str, _context: &[String]) -> Result<String, RuntimeError> {
        self.asked.lock().push(user_message.to_string());
        Ok(format!("You said: {}", user_message))
    }

    fn clear_history(&self) {}
}

struct TestServer {
    base: String,
    agent: Arc<Agent>,
    http: reqwest::Client,
}

async fn start() -> TestServer {
    let config = Arc::new(AgentConfig::default());
    let store = Arc::new(AgentStore::in_memory().unwrap());
    let model = Arc::new(EchoModel {
        asked: Mutex::new(Vec::new()),
    });
    let agent = Arc::new(Agent::with_model(Arc::clone(&config), store, model).unwrap());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(AppState::new(Arc::clone(&agent), config));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://{}", addr),
        agent,
        http: reqwest::Client::new(),
    }
}

impl TestServer {
    async fn get(&self, path: &str) -> (u16, Value) {
        let response = self.http.get(format!("{}{}", self.base, path)).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_root_and_health() {
    let server = start().await;

    let (status, body) = server.get("/").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "running");
    assert!(body["version"].is_string());

    let (status, body) = server.get("/health").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_execute_direct_command() {
    let server = start().await;

    let response = server
        .http
        .post(format!("{}/api/commands/execute", server.base))
        .json(&json!({ "command": "calculator 2 + 2 * 2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["command"], "calculator 2 + 2 * 2");
    assert!(body["response"].as_str().unwrap().ends_with("= 6"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_execute_accepts_query_and_routes_free_text() {
    let server = start().await;

    let response = server
        .http
        .post(format!("{}/api/commands/execute", server.base))
        .query(&[("command", "hello agent")])
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["response"], "You said: hello agent");
}

#[tokio::test]
async fn test_execute_without_command() {
    let server = start().await;
    let response = server
        .http
        .post(format!("{}/api/commands/execute", server.base))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_history_is_newest_first_and_truncated() {
    let server = start().await;
    let long_result = "x".repeat(500);
    server
        .agent
        .store()
        .log_command("read_file big.txt", &long_result, true, 0.1)
        .unwrap();
    server
        .agent
        .store()
        .log_command("current_time", "now", true, 0.0)
        .unwrap();

    let (status, body) = server.get("/api/commands/history?limit=10").await;
    assert_eq!(status, 200);
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["command"], "current_time");
    assert_eq!(history[1]["result"].as_str().unwrap().chars().count(), 200);

    let (_, body) = server.get("/api/commands/history?limit=1").await;
    assert_eq!(body["history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_file_search() {
    let server = start().await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("report.pdf"), "pdf").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "txt").unwrap();

    let (status, body) = server
        .get(&format!(
            "/api/files/search?pattern=.pdf&directory={}",
            dir.path().display()
        ))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["name"], "report.pdf");
}

#[tokio::test]
async fn test_forbidden_search_is_500() {
    let server = start().await;
    let (status, body) = server.get("/api/files/search?directory=/proc").await;
    assert_eq!(status, 500);
    assert!(body["error"].as_str().unwrap().contains("Permission denied"));
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let server = start().await;
    let response = server
        .http
        .get(format!("{}/health", server.base))
        .header("Origin", "http://localhost:5173")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://localhost:5173"
    );

    let response = server
        .http
        .get(format!("{}/health", server.base))
        .header("Origin", "http://evil.example")
        .send()
        .await
        .unwrap();
    assert!(response.headers().get("access-control-allow-origin").is_none());
}
