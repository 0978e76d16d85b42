#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! LLM client behaviour against a server that is not there.

use desk_agent_core::LlmSettings;
use desk_agent_runtime::{ChatModel, LLMClient};

fn unused_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/v1/chat/completions", port)
}

#[tokio::test]
async fn test_unreachable_server_message() {
    let endpoint = unused_endpoint();
    let settings = LlmSettings {
        endpoint: endpoint.clone(),
        timeout_secs: 5,
        ..LlmSettings::default()
    };
    let client = LLMClient::new(&settings, 10, "system".to_string());

    let err = client.chat("hello", &[]).await.unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Could not connect"), "{}", message);
    assert!(message.contains(&endpoint));
    assert!(message.ends_with("Make sure it is running."));

    // A failed call leaves no half-recorded turn behind.
    assert!(client.history().is_empty());
}
