//! Filesystem operations - structured, guarded file management

use super::{not_found, OsError, OsResult};
use crate::sandbox::PathGuard;
use desk_agent_core::display;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

#[derive(Debug, Clone, Serialize)]
pub struct FileContent {
    pub path: PathBuf,
    pub size: u64,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub accessed: Option<String>,
    pub extension: String,
    pub mime_type: String,
    pub is_file: bool,
    pub is_directory: bool,
}

/// Read a file as lossy UTF-8, refusing anything above `max_size` bytes.
pub async fn read_file(guard: &PathGuard, path: impl AsRef<Path>, max_size: u64) -> OsResult<FileContent> {
    let path = guard.check(path)?;
    let metadata = fs::metadata(&path).await.map_err(|_| not_found(&path))?;
    if !metadata.is_file() {
        return Err(OsError::InvalidArgument(format!(
            "{} is not a file",
            path.display()
        )));
    }
    if metadata.len() > max_size {
        return Err(OsError::InvalidArgument(format!(
            "File too large ({}, limit {})",
            display::megabytes(metadata.len()),
            display::megabytes(max_size)
        )));
    }

    let bytes = fs::read(&path).await?;
    Ok(FileContent {
        size: metadata.len(),
        content: String::from_utf8_lossy(&bytes).into_owned(),
        path,
    })
}

/// List a directory, folders first, then by name.
pub async fn list_directory(guard: &PathGuard, path: impl AsRef<Path>) -> OsResult<Vec<DirEntryInfo>> {
    let path = guard.check(path)?;
    if !path.is_dir() {
        return Err(not_found(&path));
    }

    let mut entries = Vec::new();
    let mut reader = fs::read_dir(&path).await?;
    while let Some(entry) = reader.next_entry().await? {
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(_) => continue,
        };
        entries.push(DirEntryInfo {
            name: entry.file_name().to_string_lossy().to_string(),
            is_dir: metadata.is_dir(),
            size: if metadata.is_file() { metadata.len() } else { 0 },
            modified: metadata
                .modified()
                .map(display::local_timestamp)
                .unwrap_or_default(),
        });
    }

    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}

pub async fn file_info(guard: &PathGuard, path: impl AsRef<Path>) -> OsResult<FileInfo> {
    let path = guard.check(path)?;
    let metadata = fs::metadata(&path).await.map_err(|_| not_found(&path))?;
    let extension = extension_of(&path);
    let stamp = |time: std::io::Result<SystemTime>| time.ok().map(display::local_timestamp);

    Ok(FileInfo {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        size: metadata.len(),
        created: stamp(metadata.created()),
        modified: stamp(metadata.modified()),
        accessed: stamp(metadata.accessed()),
        mime_type: guess_mime(&extension).to_string(),
        extension,
        is_file: metadata.is_file(),
        is_directory: metadata.is_dir(),
        path,
    })
}

pub async fn create_folder(guard: &PathGuard, path: impl AsRef<Path>) -> OsResult<PathBuf> {
    let path = guard.check(path)?;
    fs::create_dir_all(&path).await?;
    Ok(path)
}

/// Delete a file or a whole directory tree
pub async fn delete_path(guard: &PathGuard, path: impl AsRef<Path>) -> OsResult<PathBuf> {
    let path = guard.check(path)?;
    let metadata = fs::symlink_metadata(&path)
        .await
        .map_err(|_| not_found(&path))?;

    if metadata.is_dir() {
        fs::remove_dir_all(&path).await?;
    } else {
        fs::remove_file(&path).await?;
    }
    Ok(path)
}

/// Copy a file. A directory destination receives the file under its own name.
pub async fn copy_file(guard: &PathGuard, from: impl AsRef<Path>, to: impl AsRef<Path>) -> OsResult<PathBuf> {
    let from = guard.check(from)?;
    let to = guard.check(to)?;
    if !from.is_file() {
        return Err(if from.exists() {
            OsError::InvalidArgument("Source must be a file".to_string())
        } else {
            not_found(&from)
        });
    }

    let target = into_directory(&from, to);
    fs::copy(&from, &target).await?;
    Ok(target)
}

/// Move a file or directory. Files fall back to copy plus delete when a plain
/// rename fails (different filesystems).
pub async fn move_path(guard: &PathGuard, from: impl AsRef<Path>, to: impl AsRef<Path>) -> OsResult<PathBuf> {
    let from = guard.check(from)?;
    let to = guard.check(to)?;
    if !from.exists() {
        return Err(not_found(&from));
    }

    let target = into_directory(&from, to);
    if let Err(rename_err) = fs::rename(&from, &target).await {
        if !from.is_file() {
            return Err(OsError::Io(rename_err));
        }
        tracing::debug!("rename failed ({}), copying instead", rename_err);
        fs::copy(&from, &target).await?;
        fs::remove_file(&from).await?;
    }
    Ok(target)
}

fn into_directory(from: &Path, to: PathBuf) -> PathBuf {
    match from.file_name() {
        Some(name) if to.is_dir() => to.join(name),
        _ => to,
    }
}

/// Extension with its leading dot, lowercased, or empty.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

pub fn guess_mime(extension: &str) -> &'static str {
    match extension {
        ".txt" | ".log" => "text/plain",
        ".md" => "text/markdown",
        ".csv" => "text/csv",
        ".html" | ".htm" => "text/html",
        ".css" => "text/css",
        ".js" => "text/javascript",
        ".py" => "text/x-python",
        ".rs" => "text/x-rust",
        ".json" => "application/json",
        ".xml" => "application/xml",
        ".yaml" | ".yml" => "application/yaml",
        ".pdf" => "application/pdf",
        ".zip" => "application/zip",
        ".gz" | ".tgz" => "application/gzip",
        ".tar" => "application/x-tar",
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".gif" => "image/gif",
        ".svg" => "image/svg+xml",
        ".webp" => "image/webp",
        ".mp3" => "audio/mpeg",
        ".wav" => "audio/wav",
        ".mp4" => "video/mp4",
        ".docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "Unknown",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_guard() -> PathGuard {
        PathGuard::new(["/proc", "/sys"])
    }

    #[tokio::test]
    async fn test_read_file_enforces_size_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.txt");
        std::fs::write(&path, vec![b'a'; 2048]).unwrap();

        let err = read_file(&open_guard(), &path, 1024).await.unwrap_err();
        assert!(err.to_string().contains("File too large"));

        let ok = read_file(&open_guard(), &path, 4096).await.unwrap();
        assert_eq!(ok.size, 2048);
    }

    #[tokio::test]
    async fn test_read_file_is_lossy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin.dat");
        std::fs::write(&path, [0x66, 0x6f, 0xff, 0x6f]).unwrap();
        let content = read_file(&open_guard(), &path, 1024).await.unwrap();
        assert!(content.content.starts_with("fo"));
    }

    #[tokio::test]
    async fn test_list_directory_folders_first() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("zeta")).unwrap();

        let entries = list_directory(&open_guard(), dir.path()).await.unwrap();
        assert_eq!(entries[0].name, "zeta");
        assert!(entries[0].is_dir);
        assert_eq!(entries[1].name, "a.txt");
    }

    #[tokio::test]
    async fn test_copy_into_directory_and_move() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("note.txt");
        std::fs::write(&src, "hello").unwrap();
        let dest_dir = dir.path().join("out");
        std::fs::create_dir(&dest_dir).unwrap();

        let copied = copy_file(&open_guard(), &src, &dest_dir).await.unwrap();
        assert_eq!(copied, dest_dir.join("note.txt"));

        let moved = move_path(&open_guard(), &src, dir.path().join("renamed.txt"))
            .await
            .unwrap();
        assert!(moved.exists());
        assert!(!src.exists());
    }

    #[tokio::test]
    async fn test_delete_tree() {
        let dir = TempDir::new().unwrap();
        let tree = dir.path().join("tree/nested");
        std::fs::create_dir_all(&tree).unwrap();
        std::fs::write(tree.join("f"), "x").unwrap();

        delete_path(&open_guard(), dir.path().join("tree")).await.unwrap();
        assert!(!dir.path().join("tree").exists());
        assert!(matches!(
            delete_path(&open_guard(), dir.path().join("tree")).await,
            Err(OsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_guard_applies() {
        let err = read_file(&open_guard(), "/proc/self/status", 1024).await.unwrap_err();
        assert!(matches!(err, OsError::PermissionDenied(_)));
    }

    #[test]
    fn test_mime_guess() {
        assert_eq!(guess_mime(".json"), "application/json");
        assert_eq!(guess_mime(".unknown"), "Unknown");
        assert_eq!(extension_of(Path::new("/a/B.TXT")), ".txt");
    }
}
