//! Recursive directory scans: name search, text search, size and age
//! reports, duplicate detection and index candidates.

use super::filesystem::extension_of;
use super::hashing::{self, HashAlgorithm};
use super::{blocking, not_found, OsError, OsResult};
use crate::sandbox::PathGuard;
use chrono::{DateTime, Local};
use desk_agent_core::display;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

pub const DEFAULT_TEXT_EXTENSIONS: [&str; 6] = [".txt", ".py", ".md", ".json", ".log", ".csv"];
const LARGEST_FILES_SHOWN: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct FoundFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextMatch {
    pub file: PathBuf,
    pub line_number: usize,
    pub line: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SizedFile {
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LargeFiles {
    pub files: Vec<SizedFile>,
    /// Total matches before truncation.
    pub count: usize,
    pub min_size_mb: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub hash: String,
    pub files: Vec<SizedFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateReport {
    pub groups: Vec<DuplicateGroup>,
    pub duplicate_files: usize,
    pub wasted_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OldFile {
    pub path: PathBuf,
    pub modified: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderAnalysis {
    pub total_files: usize,
    pub total_size: u64,
    pub file_types: BTreeMap<String, usize>,
    pub largest_files: Vec<SizedFile>,
}

/// File metadata gathered for the persistent file index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexCandidate {
    pub filepath: String,
    pub filename: String,
    pub extension: String,
    pub size: u64,
    pub modified_date: String,
    /// MD5 of the path string; identifies the entry, not the content.
    pub hash: String,
    pub tags: String,
}

fn guarded_dir(guard: &PathGuard, dir: impl AsRef<Path>) -> OsResult<PathBuf> {
    let dir = guard.check(dir)?;
    if !dir.is_dir() {
        return Err(not_found(&dir));
    }
    Ok(dir)
}

/// Regular files under `root`, skipping unreadable entries. Forbidden
/// directories are pruned without being descended into.
fn walk_files(root: &Path, guard: &PathGuard) -> impl Iterator<Item = walkdir::DirEntry> {
    let guard = guard.clone();
    WalkDir::new(root)
        .into_iter()
        .filter_entry(move |entry| !guard.is_forbidden(entry.path()))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
}

fn file_name(entry: &walkdir::DirEntry) -> String {
    entry.file_name().to_string_lossy().to_string()
}

fn modified_of(metadata: &std::fs::Metadata) -> String {
    metadata
        .modified()
        .map(display::local_timestamp)
        .unwrap_or_default()
}

/// Find files by extension (a filter starting with `.`) or by a glob on the
/// file name. No filter matches everything.
pub async fn search_files(
    guard: &PathGuard,
    dir: impl AsRef<Path>,
    filter: Option<&str>,
    limit: usize,
) -> OsResult<Vec<FoundFile>> {
    let dir = guarded_dir(guard, dir)?;
    let filter = filter.unwrap_or("*").to_string();

    let guard = guard.clone();
    blocking(move || {
        let matcher: Box<dyn Fn(&str) -> bool + Send> = if filter.starts_with('.') {
            let extension = filter.to_lowercase();
            Box::new(move |name: &str| name.to_lowercase().ends_with(&extension))
        } else {
            let pattern = glob::Pattern::new(&filter)
                .map_err(|e| OsError::InvalidArgument(format!("bad pattern '{}': {}", filter, e)))?;
            Box::new(move |name: &str| pattern.matches(name))
        };

        let mut found = Vec::new();
        for entry in walk_files(&dir, &guard) {
            if found.len() >= limit {
                break;
            }
            let name = file_name(&entry);
            if !matcher(&name) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            found.push(FoundFile {
                name,
                path: entry.into_path(),
                size: metadata.len(),
                modified: modified_of(&metadata),
            });
        }
        Ok(found)
    })
    .await
}

/// Case-insensitive line search. Files without an extension are always
/// searched; others only when their extension is listed.
pub async fn search_in_files(
    guard: &PathGuard,
    dir: impl AsRef<Path>,
    text: &str,
    extensions: &[String],
    limit: usize,
) -> OsResult<Vec<TextMatch>> {
    let dir = guarded_dir(guard, dir)?;
    let needle = text.to_lowercase();
    let extensions: Vec<String> = if extensions.is_empty() {
        DEFAULT_TEXT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    } else {
        extensions
            .iter()
            .map(|e| {
                let e = e.to_lowercase();
                if e.starts_with('.') { e } else { format!(".{}", e) }
            })
            .collect()
    };

    let guard = guard.clone();
    blocking(move || {
        let mut matches = Vec::new();
        'files: for entry in walk_files(&dir, &guard) {
            let extension = extension_of(entry.path());
            if !extension.is_empty() && !extensions.contains(&extension) {
                continue;
            }
            let Ok(file) = std::fs::File::open(entry.path()) else {
                continue;
            };
            for (index, line) in BufReader::new(file).split(b'\n').enumerate() {
                let Ok(raw) = line else {
                    break;
                };
                let line = String::from_utf8_lossy(&raw);
                if line.to_lowercase().contains(&needle) {
                    if matches.len() >= limit {
                        break 'files;
                    }
                    matches.push(TextMatch {
                        file: entry.path().to_path_buf(),
                        line_number: index + 1,
                        line: line.trim().to_string(),
                    });
                }
            }
        }
        Ok(matches)
    })
    .await
}

/// Files of at least `min_size_mb`, largest first, at most `limit` shown.
pub async fn find_large_files(
    guard: &PathGuard,
    dir: impl AsRef<Path>,
    min_size_mb: u64,
    limit: usize,
) -> OsResult<LargeFiles> {
    let dir = guarded_dir(guard, dir)?;
    let min_bytes = min_size_mb.saturating_mul(1024 * 1024);

    let guard = guard.clone();
    blocking(move || {
        let mut files: Vec<SizedFile> = walk_files(&dir, &guard)
            .filter_map(|entry| {
                let size = entry.metadata().ok()?.len();
                (size >= min_bytes).then(|| SizedFile {
                    path: entry.into_path(),
                    size,
                })
            })
            .collect();
        files.sort_by(|a, b| b.size.cmp(&a.size));
        let count = files.len();
        files.truncate(limit);
        Ok(LargeFiles {
            files,
            count,
            min_size_mb,
        })
    })
    .await
}

/// Group files by the MD5 of their content.
pub async fn find_duplicates(guard: &PathGuard, dir: impl AsRef<Path>) -> OsResult<DuplicateReport> {
    let dir = guarded_dir(guard, dir)?;

    let guard = guard.clone();
    blocking(move || {
        let mut by_hash: HashMap<String, Vec<SizedFile>> = HashMap::new();
        for entry in walk_files(&dir, &guard) {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let Ok(hash) = hashing::digest_file_blocking(HashAlgorithm::Md5, entry.path()) else {
                continue;
            };
            by_hash.entry(hash).or_default().push(SizedFile {
                path: entry.into_path(),
                size: metadata.len(),
            });
        }

        let mut groups: Vec<DuplicateGroup> = by_hash
            .into_iter()
            .filter(|(_, files)| files.len() > 1)
            .map(|(hash, mut files)| {
                files.sort_by(|a, b| a.path.cmp(&b.path));
                DuplicateGroup { hash, files }
            })
            .collect();
        groups.sort_by(|a, b| a.files[0].path.cmp(&b.files[0].path));

        let duplicate_files = groups.iter().map(|g| g.files.len() - 1).sum();
        let wasted_bytes = groups
            .iter()
            .map(|g| g.files[0].size * (g.files.len() as u64 - 1))
            .sum();

        Ok(DuplicateReport {
            groups,
            duplicate_files,
            wasted_bytes,
        })
    })
    .await
}

/// Files not modified within the last `days` days.
pub async fn find_old_files(guard: &PathGuard, dir: impl AsRef<Path>, days: u64) -> OsResult<Vec<OldFile>> {
    let dir = guarded_dir(guard, dir)?;
    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(days.saturating_mul(86_400)))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let guard = guard.clone();
    blocking(move || {
        let files = walk_files(&dir, &guard)
            .filter_map(|entry| {
                let metadata = entry.metadata().ok()?;
                let modified = metadata.modified().ok()?;
                (modified < cutoff).then(|| OldFile {
                    path: entry.into_path(),
                    modified: display::local_timestamp(modified),
                    size: metadata.len(),
                })
            })
            .collect();
        Ok(files)
    })
    .await
}

pub async fn analyze_folder(guard: &PathGuard, dir: impl AsRef<Path>) -> OsResult<FolderAnalysis> {
    let dir = guarded_dir(guard, dir)?;

    let guard = guard.clone();
    blocking(move || {
        let mut file_types: BTreeMap<String, usize> = BTreeMap::new();
        let mut sized = Vec::new();
        for entry in walk_files(&dir, &guard) {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let extension = extension_of(entry.path());
            let key = if extension.is_empty() {
                "no_extension".to_string()
            } else {
                extension
            };
            *file_types.entry(key).or_insert(0) += 1;
            sized.push(SizedFile {
                path: entry.into_path(),
                size: metadata.len(),
            });
        }

        let total_files = sized.len();
        let total_size = sized.iter().map(|f| f.size).sum();
        sized.sort_by(|a, b| b.size.cmp(&a.size));
        sized.truncate(LARGEST_FILES_SHOWN);

        Ok(FolderAnalysis {
            total_files,
            total_size,
            file_types,
            largest_files: sized,
        })
    })
    .await
}

/// Metadata for every file under `dir`, ready to be upserted into the index.
pub async fn scan_for_index(guard: &PathGuard, dir: impl AsRef<Path>) -> OsResult<Vec<IndexCandidate>> {
    let dir = guarded_dir(guard, dir)?;

    let guard = guard.clone();
    blocking(move || {
        let candidates = walk_files(&dir, &guard)
            .filter_map(|entry| {
                let metadata = entry.metadata().ok()?;
                let filepath = entry.path().to_string_lossy().to_string();
                let filename = file_name(&entry);
                let extension = extension_of(entry.path());
                let modified_date = metadata
                    .modified()
                    .map(|time| DateTime::<Local>::from(time).to_rfc3339())
                    .unwrap_or_default();
                Some(IndexCandidate {
                    hash: hashing::hash_text(&filepath, HashAlgorithm::Md5),
                    tags: format!("{} {}", extension, filename),
                    filepath,
                    filename,
                    extension,
                    size: metadata.len(),
                    modified_date,
                })
            })
            .collect();
        Ok(candidates)
    })
    .await
}
