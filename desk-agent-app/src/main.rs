use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use desk_agent_app::logging;
use desk_agent_app::repl::Repl;
use desk_agent_app::server::{self, AppState};
use desk_agent_core::AgentConfig;
use desk_agent_infra::AgentStore;
use desk_agent_runtime::Agent;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "desk-agent", version, about = "Desktop assistant driven by commands or a local language model")]
struct Cli {
    /// YAML configuration file. Defaults apply when it does not exist.
    #[arg(long, default_value = "desk-agent.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Interactive session on the terminal
    Repl,
    /// HTTP and WebSocket API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AgentConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    if let Some(Mode::Serve { host, port }) = &cli.mode {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }
    config.validate().context("Invalid configuration")?;
    config
        .ensure_directories()
        .context("Failed to create data directories")?;

    let logs_dir = config.paths.logs();
    let _log_guard = logging::init(&logs_dir)?;
    logging::prune_old_logs(&logs_dir, config.automation.log_retention_days);

    if let Err(e) = run(cli.mode.unwrap_or(Mode::Repl), Arc::new(config)).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(mode: Mode, config: Arc<AgentConfig>) -> Result<()> {
    let database = config.paths.database();
    let store = AgentStore::open(&database)
        .with_context(|| format!("Failed to open database {}", database.display()))?;
    let agent = Agent::new(Arc::clone(&config), Arc::new(store))
        .context("Failed to initialize agent")?;
    info!(
        "Desk Agent {} using {} at {}",
        env!("CARGO_PKG_VERSION"),
        config.llm.model,
        config.llm.endpoint
    );
    let agent = Arc::new(agent);

    match mode {
        Mode::Repl => Repl::new(agent).run().await,
        Mode::Serve { .. } => {
            let host = config.server.host.clone();
            let port = config.server.port;
            server::serve(AppState::new(agent, config), &host, port).await
        }
    }
}
