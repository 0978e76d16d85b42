//! Backups and directory change detection.

use super::{blocking, not_found, OsError, OsResult};
use crate::sandbox::PathGuard;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize)]
pub struct BackupSummary {
    pub backup_dir: PathBuf,
    pub files_copied: usize,
    pub bytes: u64,
}

/// Paths added, modified and deleted between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DirectoryChanges {
    pub added: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
}

impl DirectoryChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

pub type Snapshot = BTreeMap<PathBuf, (u64, Option<SystemTime>)>;

/// Copy `source` (file or tree) into `<dest>/backup_<YYYYmmdd_HHMMSS>/`.
pub async fn backup_files(guard: &PathGuard, source: impl AsRef<Path>, dest: impl AsRef<Path>) -> OsResult<BackupSummary> {
    let source = guard.check(source)?;
    let dest = guard.check(dest)?;
    if !source.exists() {
        return Err(not_found(&source));
    }
    let backup_dir = dest.join(format!(
        "backup_{}",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ));
    if backup_dir.starts_with(&source) && source.is_dir() {
        return Err(OsError::InvalidArgument(
            "backup destination cannot be inside the source".to_string(),
        ));
    }

    let guard = guard.clone();
    blocking(move || {
        std::fs::create_dir_all(&backup_dir)?;
        let base = source.parent().unwrap_or(&source).to_path_buf();
        let mut files_copied = 0;
        let mut bytes = 0;

        let entries = WalkDir::new(&source)
            .into_iter()
            .filter_entry(|entry| !guard.is_forbidden(entry.path()))
            .filter_map(Result::ok);
        for entry in entries {
            let Ok(relative) = entry.path().strip_prefix(&base) else {
                continue;
            };
            let target = backup_dir.join(relative);
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target)?;
            } else if entry.file_type().is_file() {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                bytes += std::fs::copy(entry.path(), &target)?;
                files_copied += 1;
            }
        }

        Ok(BackupSummary {
            backup_dir,
            files_copied,
            bytes,
        })
    })
    .await
}

pub fn snapshot(dir: &Path) -> Snapshot {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            Some((entry.into_path(), (metadata.len(), metadata.modified().ok())))
        })
        .collect()
}

pub fn diff_snapshots(before: &Snapshot, after: &Snapshot) -> DirectoryChanges {
    let before_keys: BTreeSet<&PathBuf> = before.keys().collect();
    let after_keys: BTreeSet<&PathBuf> = after.keys().collect();

    DirectoryChanges {
        added: after_keys.difference(&before_keys).map(|p| (*p).clone()).collect(),
        deleted: before_keys.difference(&after_keys).map(|p| (*p).clone()).collect(),
        modified: after
            .iter()
            .filter(|(path, state)| before.get(*path).is_some_and(|old| old != *state))
            .map(|(path, _)| path.clone())
            .collect(),
    }
}

/// Snapshot `dir`, wait `wait`, snapshot again and report the difference.
pub async fn watch_directory(guard: &PathGuard, dir: impl AsRef<Path>, wait: Duration) -> OsResult<DirectoryChanges> {
    let dir = guard.check(dir)?;
    if !dir.is_dir() {
        return Err(not_found(&dir));
    }

    let first = dir.clone();
    let before = blocking(move || Ok(snapshot(&first))).await?;
    tokio::time::sleep(wait).await;
    let after = blocking(move || Ok(snapshot(&dir))).await?;

    Ok(diff_snapshots(&before, &after))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_diff_snapshots() {
        let t0 = SystemTime::UNIX_EPOCH;
        let t1 = t0 + Duration::from_secs(10);
        let before: Snapshot = [
            (PathBuf::from("/w/keep"), (1, Some(t0))),
            (PathBuf::from("/w/edit"), (1, Some(t0))),
            (PathBuf::from("/w/gone"), (1, Some(t0))),
        ]
        .into_iter()
        .collect();
        let after: Snapshot = [
            (PathBuf::from("/w/keep"), (1, Some(t0))),
            (PathBuf::from("/w/edit"), (4, Some(t1))),
            (PathBuf::from("/w/new"), (2, Some(t1))),
        ]
        .into_iter()
        .collect();

        let changes = diff_snapshots(&before, &after);
        assert_eq!(changes.added, vec![PathBuf::from("/w/new")]);
        assert_eq!(changes.modified, vec![PathBuf::from("/w/edit")]);
        assert_eq!(changes.deleted, vec![PathBuf::from("/w/gone")]);
    }

    #[tokio::test]
    async fn test_backup_copies_tree() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("docs");
        std::fs::create_dir_all(source.join("sub")).unwrap();
        std::fs::write(source.join("a.txt"), "aaa").unwrap();
        std::fs::write(source.join("sub/b.txt"), "bb").unwrap();

        let guard = PathGuard::new(["/proc"]);
        let summary = backup_files(&guard, &source, dir.path().join("backups")).await.unwrap();

        assert_eq!(summary.files_copied, 2);
        assert_eq!(summary.bytes, 5);
        let name = summary.backup_dir.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("backup_"));
        assert!(summary.backup_dir.join("docs/sub/b.txt").is_file());
    }

    #[tokio::test]
    async fn test_backup_skips_forbidden_subfolder() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("docs");
        std::fs::create_dir_all(source.join("private")).unwrap();
        std::fs::write(source.join("a.txt"), "aaa").unwrap();
        std::fs::write(source.join("private/key.pem"), "secret").unwrap();

        let private = source.join("private").to_string_lossy().to_string();
        let guard = PathGuard::new([private]);
        let summary = backup_files(&guard, &source, dir.path().join("backups")).await.unwrap();

        assert_eq!(summary.files_copied, 1);
        assert!(!summary.backup_dir.join("docs/private").exists());
    }

    #[tokio::test]
    async fn test_watch_without_changes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("still.txt"), "x").unwrap();
        let guard = PathGuard::new(["/proc"]);
        let changes = watch_directory(&guard, dir.path(), Duration::from_millis(10))
            .await
            .unwrap();
        assert!(changes.is_empty());
    }
}
