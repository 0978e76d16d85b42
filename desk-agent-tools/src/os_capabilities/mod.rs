//! Structured OS capability layer.
//!
//! Every wrapper is an `async fn` returning a serializable payload. Blocking
//! work (sysinfo refreshes, directory walks, hashing, archives) is moved onto
//! the blocking pool with [`blocking`].

pub mod archive;
pub mod automation;
pub mod desktop;
pub mod filesystem;
pub mod hashing;
pub mod monitoring;
pub mod network;
pub mod process;
pub mod search;
pub mod security;
pub mod system;
pub mod utilities;

use tokio::process::Command;

/// OS capability error types
#[derive(Debug, thiserror::Error)]
pub enum OsError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// An optional OS tool or library is missing.
    #[error("{0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type OsResult<T> = Result<T, OsError>;

/// Run a closure on the blocking pool and flatten the join error.
pub(crate) async fn blocking<T, F>(f: F) -> OsResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> OsResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| OsError::OperationFailed(e.to_string()))?
}

pub(crate) async fn command_exists(command: &str) -> bool {
    let probe = if cfg!(windows) { "where" } else { "which" };
    Command::new(probe)
        .arg(command)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

pub(crate) async fn run_checked(command: &str, args: &[&str]) -> OsResult<()> {
    let output = Command::new(command).args(args).output().await?;
    if output.status.success() {
        return Ok(());
    }
    Err(OsError::OperationFailed(
        String::from_utf8_lossy(&output.stderr).trim().to_string(),
    ))
}

pub(crate) async fn run_output(command: &str, args: &[&str]) -> OsResult<String> {
    let output = Command::new(command).args(args).output().await?;
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).to_string());
    }
    Err(OsError::OperationFailed(
        String::from_utf8_lossy(&output.stderr).trim().to_string(),
    ))
}

pub(crate) fn not_found(path: &std::path::Path) -> OsError {
    OsError::NotFound(path.display().to_string())
}
