//! HTTP and WebSocket facade over the agent.

use anyhow::Context;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use desk_agent_core::{display, AgentConfig};
use desk_agent_runtime::Agent;
use desk_agent_tools::os_capabilities::process::{self, ProcessSort};
use desk_agent_tools::os_capabilities::{search, system};
use desk_agent_tools::PathGuard;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};

pub const STATS_INTERVAL: Duration = Duration::from_secs(2);
pub const HISTORY_RESULT_CHARS: usize = 200;

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub config: Arc<AgentConfig>,
    guard: PathGuard,
}

impl AppState {
    pub fn new(agent: Arc<Agent>, config: Arc<AgentConfig>) -> Self {
        let guard = PathGuard::new(&config.security.forbidden_paths);
        Self { agent, config, guard }
    }
}

/// Handler failure rendered as HTTP 500 with `{error}`.
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/system/info", get(system_info))
        .route("/api/system/stats", get(system_stats))
        .route("/api/system/processes", get(processes))
        .route("/api/commands/execute", post(execute))
        .route("/api/commands/history", get(history))
        .route("/api/files/search", get(search_files))
        .route("/ws", get(stats_socket))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Bind and serve until the process is interrupted.
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    info!("API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .await
        .context("Server stopped")
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Desk Agent API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn system_info() -> ApiResult {
    let info = system::system_info().await?;
    let disk = info.disk.map(|d| {
        json!({
            "total": d.total,
            "used": d.used,
            "free": d.free,
            "percent": d.percent,
        })
    });
    Ok(Json(json!({
        "cpu": {
            "percent": info.cpu.usage_percent,
            "count": info.cpu.logical_cores,
            "frequency_mhz": info.cpu.frequency_mhz,
        },
        "memory": {
            "total": info.memory.total,
            "available": info.memory.available,
            "used": info.memory.used,
            "percent": info.memory.percent,
        },
        "disk": disk,
        "system": {
            "platform": info.system.platform,
            "version": info.system.version,
            "architecture": info.system.architecture,
            "hostname": info.system.hostname,
        },
        "timestamp": display::now_timestamp(),
    })))
}

async fn stats_payload() -> anyhow::Result<Value> {
    let snapshot = system::resource_snapshot().await?;
    Ok(json!({
        "cpu": snapshot.cpu_percent,
        "memory": snapshot.memory_percent,
        "disk": snapshot.disk_percent,
        "timestamp": snapshot.timestamp,
    }))
}

async fn system_stats() -> ApiResult {
    Ok(Json(stats_payload().await?))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

async fn processes(Query(query): Query<LimitQuery>) -> ApiResult {
    let limit = query.limit.unwrap_or(20);
    let processes = process::list_processes(ProcessSort::Cpu, limit).await?;
    Ok(Json(json!({ "processes": processes })))
}

#[derive(Debug, Default, Deserialize)]
pub struct CommandRequest {
    pub command: Option<String>,
}

async fn execute(
    State(state): State<AppState>,
    Query(query): Query<CommandRequest>,
    body: Option<Json<CommandRequest>>,
) -> Response {
    let command = body
        .and_then(|Json(request)| request.command)
        .or(query.command)
        .unwrap_or_default();
    if command.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No command provided" })),
        )
            .into_response();
    }

    info!("API command: {}", command);
    let reply = state.agent.handle(&command).await;
    Json(json!({
        "success": reply.success,
        "command": command,
        "response": reply.text,
        "timestamp": display::now_timestamp(),
    }))
    .into_response()
}

async fn history(State(state): State<AppState>, Query(query): Query<LimitQuery>) -> ApiResult {
    let limit = query.limit.unwrap_or(50);
    let records = state.agent.store().recent_commands(limit)?;
    let history: Vec<Value> = records
        .into_iter()
        .map(|record| {
            json!({
                "timestamp": record.timestamp,
                "command": record.command,
                "result": display::truncate_chars(&record.result, HISTORY_RESULT_CHARS),
                "success": record.success,
                "execution_time": record.execution_time,
            })
        })
        .collect();
    Ok(Json(json!({ "history": history })))
}

#[derive(Debug, Deserialize)]
pub struct FileSearchQuery {
    pub pattern: Option<String>,
    pub directory: Option<String>,
    pub limit: Option<usize>,
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn search_files(State(state): State<AppState>, Query(query): Query<FileSearchQuery>) -> ApiResult {
    let directory = query.directory.map(PathBuf::from).unwrap_or_else(home_dir);
    let limit = query.limit.unwrap_or(state.config.limits.max_search_results);
    let found = search::search_files(&state.guard, &directory, query.pattern.as_deref(), limit).await?;
    Ok(Json(json!({
        "count": found.len(),
        "results": found,
    })))
}

async fn stats_socket(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(push_stats)
}

async fn push_stats(socket: WebSocket) {
    debug!("Stats socket connected");
    let (mut sender, mut receiver) = socket.split();
    let mut ticker = tokio::time::interval(STATS_INTERVAL);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let data = match stats_payload().await {
                    Ok(data) => data,
                    Err(e) => {
                        warn!("Failed to sample stats: {}", e);
                        continue;
                    }
                };
                let message = json!({ "type": "system_stats", "data": data }).to_string();
                if sender.send(Message::Text(message)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("Stats socket closed");
}
