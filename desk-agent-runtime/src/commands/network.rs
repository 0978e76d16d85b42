//! Connectivity checks, downloads and browser helpers.

use super::args::{self, arg};
use super::{Category, Command, CommandContext, CommandRegistry, CommandSpec};
use crate::interfaces::CommandError;
use async_trait::async_trait;
use desk_agent_core::display;
use desk_agent_tools::os_capabilities::{desktop, network};
use std::fmt::Write;
use std::sync::Arc;

pub fn register(registry: &mut CommandRegistry) {
    registry
        .register(Arc::new(CheckInternet))
        .register(Arc::new(DownloadFile))
        .register(Arc::new(OpenWebpage))
        .register(Arc::new(Ping))
        .register(Arc::new(GetIpInfo))
        .register(Arc::new(ListNetworkConnections))
        .register(Arc::new(Speedtest))
        .register(Arc::new(CheckWebsiteStatus));
}

pub struct CheckInternet;

#[async_trait]
impl Command for CheckInternet {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "check_internet",
            Category::Network,
            0,
            "check_internet",
            "Check whether the internet is reachable",
        )
    }

    async fn run(&self, ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let status = network::check_internet(&ctx.http).await;
        if !status.connected {
            return Err(CommandError::Failed("No internet connection".to_string()));
        }
        let latency = status
            .latency_ms
            .map(|ms| format!(" ({:.0} ms)", ms))
            .unwrap_or_default();
        Ok(format!("🌐 Internet connection is up{}", latency))
    }
}

pub struct DownloadFile;

#[async_trait]
impl Command for DownloadFile {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "download_file",
            Category::Network,
            2,
            "download_file <url> <path>",
            "Download a URL to a local file",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let download =
            network::download_file(&ctx.http, &ctx.guard, arg(args, 0), arg(args, 1)).await?;
        Ok(format!(
            "⬇️ Downloaded {} to {} ({})",
            download.url,
            download.path.display(),
            display::megabytes(download.bytes)
        ))
    }
}

pub struct OpenWebpage;

#[async_trait]
impl Command for OpenWebpage {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "open_webpage",
            Category::Network,
            1,
            "open_webpage <url>",
            "Open a web page in the default browser",
        )
    }

    async fn run(&self, _ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let url = desktop::open_url(arg(args, 0)).await?;
        Ok(format!("🌐 Opened {}", url))
    }
}

pub struct Ping;

#[async_trait]
impl Command for Ping {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "ping",
            Category::Network,
            1,
            "ping <host> [count=4]",
            "Ping a host",
        )
    }

    async fn run(&self, _ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let count: u32 = args::number_or(args, 1, "count", 4)?;
        let result = network::ping(arg(args, 0), count).await?;
        if !result.success {
            return Err(CommandError::Failed(format!(
                "{} is unreachable\n{}",
                result.host, result.output
            )));
        }
        Ok(format!("📡 {} is reachable\n{}", result.host, result.output))
    }
}

pub struct GetIpInfo;

#[async_trait]
impl Command for GetIpInfo {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "get_ip_info",
            Category::Network,
            0,
            "get_ip_info",
            "Host name, local and external IP address",
        )
    }

    async fn run(&self, ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let info = network::ip_info(&ctx.http).await?;
        Ok(format!(
            "🌐 Host: {}\n  Local IP: {}\n  External IP: {}",
            info.hostname,
            info.local_ip
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            info.external_ip.unwrap_or_else(|| "unavailable".to_string())
        ))
    }
}

pub struct ListNetworkConnections;

#[async_trait]
impl Command for ListNetworkConnections {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "list_network_connections",
            Category::Network,
            0,
            "list_network_connections",
            "Established TCP connections",
        )
    }

    async fn run(&self, _ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let connections = network::network_connections().await?;
        if connections.total == 0 {
            return Ok("🔌 No established connections".to_string());
        }
        let mut out = format!("🔌 {} established connection(s):\n", connections.total);
        for conn in &connections.connections {
            let _ = writeln!(out, "  {} → {} [{}]", conn.local, conn.remote, conn.state);
        }
        if connections.total > connections.connections.len() {
            let _ = write!(
                out,
                "  ... and {} more",
                connections.total - connections.connections.len()
            );
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct Speedtest;

#[async_trait]
impl Command for Speedtest {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "speedtest",
            Category::Network,
            0,
            "speedtest",
            "Measure download speed and latency",
        )
    }

    async fn run(&self, ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let result = network::speedtest(&ctx.http).await?;
        Ok(format!(
            "🚀 Download: {:.2} Mbit/s\n  Ping: {:.0} ms\n  Test file: {}",
            result.download_mbps,
            result.ping_ms,
            display::megabytes(result.test_file_bytes)
        ))
    }
}

pub struct CheckWebsiteStatus;

#[async_trait]
impl Command for CheckWebsiteStatus {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "check_website_status",
            Category::Network,
            1,
            "check_website_status <url>",
            "HTTP status, response time and server of a site",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let status = network::website_status(&ctx.http, arg(args, 0)).await?;
        let text = format!(
            "{}\n  Status: {} {}\n  Response time: {:.0} ms\n  Server: {}",
            status.url,
            status.status_code,
            status.reason,
            status.response_ms,
            status.server.as_deref().unwrap_or("unknown")
        );
        if status.ok {
            Ok(format!("✅ {}", text))
        } else {
            Err(CommandError::Failed(text))
        }
    }
}
