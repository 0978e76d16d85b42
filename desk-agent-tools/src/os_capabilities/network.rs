//! Network utilities: connectivity probes, downloads, ping, connection
//! listing and a rough speed test.

use super::{blocking, OsError, OsResult};
use crate::sandbox::PathGuard;
use futures::StreamExt;
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub const CONNECTIVITY_PROBE_URL: &str = "https://www.google.com";
pub const EXTERNAL_IP_URL: &str = "https://api.ipify.org";
pub const SPEEDTEST_URL: &str = "http://speedtest.ftp.otenet.gr/files/test1Mb.db";
const CONNECTIONS_SHOWN: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct InternetStatus {
    pub connected: bool,
    pub latency_ms: Option<f64>,
    pub status_code: Option<u16>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Download {
    pub url: String,
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PingResult {
    pub host: String,
    pub success: bool,
    pub output: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IpInfo {
    pub hostname: String,
    pub local_ip: Option<IpAddr>,
    pub external_ip: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub local: String,
    pub remote: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Connections {
    pub connections: Vec<Connection>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeedTest {
    pub download_mbps: f64,
    pub ping_ms: f64,
    pub test_file_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebsiteStatus {
    pub url: String,
    pub status_code: u16,
    pub reason: String,
    pub response_ms: f64,
    pub server: Option<String>,
    pub ok: bool,
}

/// Prepend `default_scheme://` when the URL has no scheme.
pub fn with_scheme(url: &str, default_scheme: &str) -> String {
    let url = url.trim();
    if url.contains("://") {
        url.to_string()
    } else {
        format!("{}://{}", default_scheme, url)
    }
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

fn request_error(url: &str, err: reqwest::Error) -> OsError {
    OsError::OperationFailed(format!("request to {} failed: {}", url, err))
}

/// GET the probe URL with a 5 s timeout. Failure means "not connected".
pub async fn check_internet(client: &reqwest::Client) -> InternetStatus {
    let started = Instant::now();
    match client
        .get(CONNECTIVITY_PROBE_URL)
        .timeout(Duration::from_secs(5))
        .send()
        .await
    {
        Ok(response) => InternetStatus {
            connected: true,
            latency_ms: Some(millis(started.elapsed())),
            status_code: Some(response.status().as_u16()),
        },
        Err(e) => {
            tracing::debug!("Connectivity probe failed: {}", e);
            InternetStatus {
                connected: false,
                latency_ms: None,
                status_code: None,
            }
        }
    }
}

/// Stream `url` to `path`.
pub async fn download_file(
    client: &reqwest::Client,
    guard: &PathGuard,
    url: &str,
    path: impl AsRef<Path>,
) -> OsResult<Download> {
    let path = guard.check(path)?;
    let url = with_scheme(url, "https");
    let response = client
        .get(&url)
        .timeout(Duration::from_secs(300))
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| request_error(&url, e))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::File::create(&path).await?;
    let mut stream = response.bytes_stream();
    let mut bytes = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| request_error(&url, e))?;
        file.write_all(&chunk).await?;
        bytes += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(Download { url, path, bytes })
}

pub async fn ping(host: &str, count: u32) -> OsResult<PingResult> {
    let host = host.trim();
    if host.is_empty()
        || host.starts_with('-')
        || !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '_'))
    {
        return Err(OsError::InvalidArgument(format!("invalid host: {}", host)));
    }

    let count_flag = if cfg!(windows) { "-n" } else { "-c" };
    let count = count.clamp(1, 100).to_string();
    let output = tokio::time::timeout(
        Duration::from_secs(15),
        Command::new("ping").args([count_flag, count.as_str(), host]).output(),
    )
    .await
    .map_err(|_| OsError::OperationFailed(format!("ping {} timed out", host)))??;

    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
    if !output.status.success() && text.trim().is_empty() {
        text = String::from_utf8_lossy(&output.stderr).to_string();
    }
    Ok(PingResult {
        host: host.to_string(),
        success: output.status.success(),
        output: text.trim().to_string(),
    })
}

/// Address of the interface the OS would route external traffic through.
fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

pub async fn ip_info(client: &reqwest::Client) -> OsResult<IpInfo> {
    let local_ip = blocking(|| Ok(local_ip())).await?;
    let external_ip = match client
        .get(EXTERNAL_IP_URL)
        .timeout(Duration::from_secs(5))
        .send()
        .await
    {
        Ok(response) => response.text().await.ok().map(|ip| ip.trim().to_string()),
        Err(e) => {
            tracing::debug!("External IP lookup failed: {}", e);
            None
        }
    };

    Ok(IpInfo {
        hostname: sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string()),
        local_ip,
        external_ip,
    })
}

/// Established TCP connections, first 50 plus the total.
pub async fn network_connections() -> OsResult<Connections> {
    let mut all = if cfg!(target_os = "linux") {
        blocking(|| {
            let mut found = Vec::new();
            for table in ["/proc/net/tcp", "/proc/net/tcp6"] {
                if let Ok(content) = std::fs::read_to_string(table) {
                    found.extend(parse_proc_net_tcp(&content));
                }
            }
            Ok(found)
        })
        .await?
    } else {
        let output = super::run_output("netstat", &["-an"]).await?;
        parse_netstat(&output)
    };

    let total = all.len();
    all.truncate(CONNECTIONS_SHOWN);
    Ok(Connections {
        connections: all,
        total,
    })
}

/// Established rows of `/proc/net/tcp` or `/proc/net/tcp6`.
pub fn parse_proc_net_tcp(content: &str) -> Vec<Connection> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 || fields[3] != "01" {
                return None;
            }
            Some(Connection {
                local: parse_proc_addr(fields[1])?.to_string(),
                remote: parse_proc_addr(fields[2])?.to_string(),
                state: "ESTABLISHED".to_string(),
            })
        })
        .collect()
}

/// `0100007F:1F90` -> `127.0.0.1:8080`. Addresses are stored as
/// little-endian 32-bit words.
fn parse_proc_addr(raw: &str) -> Option<SocketAddr> {
    let (addr, port) = raw.split_once(':')?;
    let port = u16::from_str_radix(port, 16).ok()?;
    let ip = match addr.len() {
        8 => IpAddr::V4(Ipv4Addr::from(u32::from_str_radix(addr, 16).ok()?.swap_bytes())),
        32 => {
            let mut octets = [0u8; 16];
            for (word_index, chunk) in addr.as_bytes().chunks(8).enumerate() {
                let word = u32::from_str_radix(std::str::from_utf8(chunk).ok()?, 16).ok()?;
                octets[word_index * 4..word_index * 4 + 4].copy_from_slice(&word.to_le_bytes());
            }
            IpAddr::V6(Ipv6Addr::from(octets))
        }
        _ => return None,
    };
    Some(SocketAddr::new(ip, port))
}

fn parse_netstat(output: &str) -> Vec<Connection> {
    output
        .lines()
        .filter(|line| line.contains("ESTABLISHED"))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            // Windows: proto local remote state; BSD: proto recv send local remote state
            let (local, remote) = match fields.len() {
                4 => (fields[1], fields[2]),
                n if n >= 6 => (fields[3], fields[4]),
                _ => return None,
            };
            Some(Connection {
                local: local.to_string(),
                remote: remote.to_string(),
                state: "ESTABLISHED".to_string(),
            })
        })
        .collect()
}

/// Time a 1 MB download and a latency probe.
pub async fn speedtest(client: &reqwest::Client) -> OsResult<SpeedTest> {
    let started = Instant::now();
    let body = client
        .get(SPEEDTEST_URL)
        .timeout(Duration::from_secs(30))
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| request_error(SPEEDTEST_URL, e))?
        .bytes()
        .await
        .map_err(|e| request_error(SPEEDTEST_URL, e))?;
    let elapsed = started.elapsed().as_secs_f64().max(f64::EPSILON);

    let ping_started = Instant::now();
    client
        .get(CONNECTIVITY_PROBE_URL)
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .map_err(|e| request_error(CONNECTIVITY_PROBE_URL, e))?;
    let ping_ms = millis(ping_started.elapsed());

    let megabits = body.len() as f64 * 8.0 / 1_000_000.0;
    Ok(SpeedTest {
        download_mbps: megabits / elapsed,
        ping_ms,
        test_file_bytes: body.len() as u64,
    })
}

pub async fn website_status(client: &reqwest::Client, url: &str) -> OsResult<WebsiteStatus> {
    let url = with_scheme(url, "https");
    let started = Instant::now();
    let response = client
        .get(&url)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| request_error(&url, e))?;
    let status = response.status();

    Ok(WebsiteStatus {
        status_code: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("").to_string(),
        response_ms: millis(started.elapsed()),
        server: response
            .headers()
            .get(reqwest::header::SERVER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        ok: status.is_success(),
        url,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_with_scheme() {
        assert_eq!(with_scheme("example.com", "http"), "http://example.com");
        assert_eq!(with_scheme("https://x.org/a", "http"), "https://x.org/a");
    }

    #[test]
    fn test_parse_proc_net_tcp() {
        let table = "  sl  local_address rem_address   st tx_queue rx_queue\n\
   0: 0100007F:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000\n\
   1: 0F02000A:A2C4 2E5D3AD8:01BB 01 00000000:00000000 00:00000000 00000000\n";
        let connections = parse_proc_net_tcp(table);
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].local, "10.0.2.15:41668");
        assert_eq!(connections[0].remote, "216.58.93.46:443");
    }

    #[test]
    fn test_parse_proc_addr_v6_loopback() {
        let addr = parse_proc_addr("00000000000000000000000001000000:0050").unwrap();
        assert_eq!(addr.to_string(), "[::1]:80");
    }

    #[tokio::test]
    async fn test_ping_rejects_option_injection() {
        assert!(matches!(
            ping("-f", 1).await,
            Err(OsError::InvalidArgument(_))
        ));
        assert!(matches!(
            ping("host;rm", 1).await,
            Err(OsError::InvalidArgument(_))
        ));
    }
}
