//! Zip and tar.gz archives.

use super::{blocking, not_found, OsError, OsResult};
use crate::sandbox::PathGuard;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    Tar,
}

impl ArchiveFormat {
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSummary {
    pub archive: PathBuf,
    pub format: ArchiveFormat,
    pub entries: usize,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractSummary {
    pub destination: PathBuf,
    pub extracted: usize,
    pub skipped: Vec<String>,
}

/// Pack `sources` into `archive`. Only `.zip` and `.tar.gz`/`.tgz` are
/// written.
pub async fn compress(guard: &PathGuard, sources: &[String], archive: impl AsRef<Path>) -> OsResult<ArchiveSummary> {
    let archive = guard.check(archive)?;
    let format = match ArchiveFormat::detect(&archive) {
        Some(format @ (ArchiveFormat::Zip | ArchiveFormat::TarGz)) => format,
        _ => {
            return Err(OsError::InvalidArgument(
                "Archive must end with .zip, .tar.gz or .tgz".to_string(),
            ))
        }
    };
    let sources = sources
        .iter()
        .map(|source| {
            let path = guard.check(source)?;
            if path.exists() {
                Ok(path)
            } else {
                Err(not_found(&path))
            }
        })
        .collect::<OsResult<Vec<_>>>()?;
    if sources.is_empty() {
        return Err(OsError::InvalidArgument("nothing to compress".to_string()));
    }

    let guard = guard.clone();
    blocking(move || {
        if let Some(parent) = archive.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let entries = match format {
            ArchiveFormat::Zip => write_zip(&guard, &sources, &archive)?,
            _ => write_tar_gz(&guard, &sources, &archive)?,
        };
        Ok(ArchiveSummary {
            size: std::fs::metadata(&archive)?.len(),
            archive,
            format,
            entries,
        })
    })
    .await
}

/// Every file under `source` paired with its name inside the archive
/// (relative to the source's parent, `/`-separated). Forbidden subtrees are
/// left out.
fn archive_members(guard: &PathGuard, source: &Path) -> Vec<(PathBuf, String)> {
    let base = source.parent().unwrap_or(source);
    WalkDir::new(source)
        .into_iter()
        .filter_entry(|entry| !guard.is_forbidden(entry.path()))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(base).ok()?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            Some((entry.into_path(), name))
        })
        .collect()
}

fn write_zip(guard: &PathGuard, sources: &[PathBuf], archive: &Path) -> OsResult<usize> {
    let mut writer = ZipWriter::new(BufWriter::new(File::create(archive)?));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut count = 0;

    for source in sources {
        for (path, name) in archive_members(guard, source) {
            writer
                .start_file(name, options)
                .map_err(|e| OsError::OperationFailed(e.to_string()))?;
            io::copy(&mut BufReader::new(File::open(&path)?), &mut writer)?;
            count += 1;
        }
    }
    writer
        .finish()
        .map_err(|e| OsError::OperationFailed(e.to_string()))?;
    Ok(count)
}

fn write_tar_gz(guard: &PathGuard, sources: &[PathBuf], archive: &Path) -> OsResult<usize> {
    let encoder = GzEncoder::new(BufWriter::new(File::create(archive)?), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut count = 0;

    for source in sources {
        for (path, name) in archive_members(guard, source) {
            builder.append_path_with_name(&path, &name)?;
            count += 1;
        }
    }
    builder.into_inner()?.finish()?;
    Ok(count)
}

/// Unpack `archive` into `destination`. Zip entries whose names would
/// escape the destination are skipped.
pub async fn extract(guard: &PathGuard, archive: impl AsRef<Path>, destination: impl AsRef<Path>) -> OsResult<ExtractSummary> {
    let archive = guard.check(archive)?;
    let destination = guard.check(destination)?;
    if !archive.is_file() {
        return Err(not_found(&archive));
    }
    let format = ArchiveFormat::detect(&archive).ok_or_else(|| {
        OsError::InvalidArgument("Unsupported archive format (use .zip, .tar.gz, .tgz or .tar)".to_string())
    })?;

    blocking(move || {
        std::fs::create_dir_all(&destination)?;
        let file = BufReader::new(File::open(&archive)?);
        let (extracted, skipped) = match format {
            ArchiveFormat::Zip => extract_zip(file, &destination)?,
            ArchiveFormat::TarGz => unpack_tar(tar::Archive::new(GzDecoder::new(file)), &destination)?,
            ArchiveFormat::Tar => unpack_tar(tar::Archive::new(file), &destination)?,
        };
        Ok(ExtractSummary {
            destination,
            extracted,
            skipped,
        })
    })
    .await
}

fn extract_zip(file: BufReader<File>, destination: &Path) -> OsResult<(usize, Vec<String>)> {
    let mut zip = ZipArchive::new(file).map_err(|e| OsError::OperationFailed(e.to_string()))?;
    let mut extracted = 0;
    let mut skipped = Vec::new();

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| OsError::OperationFailed(e.to_string()))?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            skipped.push(entry.name().to_string());
            continue;
        };
        let target = destination.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        io::copy(&mut entry, &mut File::create(&target)?)?;
        extracted += 1;
    }
    if !skipped.is_empty() {
        tracing::warn!("Skipped {} unsafe zip entries", skipped.len());
    }
    Ok((extracted, skipped))
}

/// `tar::Entry::unpack_in` refuses paths that escape `destination`.
fn unpack_tar<R: io::Read>(mut archive: tar::Archive<R>, destination: &Path) -> OsResult<(usize, Vec<String>)> {
    let mut extracted = 0;
    let mut skipped = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.display().to_string();
        let is_file = entry.header().entry_type().is_file();
        if entry.unpack_in(destination)? {
            if is_file {
                extracted += 1;
            }
        } else {
            skipped.push(name);
        }
    }
    Ok((extracted, skipped))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn guard() -> PathGuard {
        PathGuard::new(["/proc"])
    }

    fn sample_tree(root: &Path) -> PathBuf {
        let project = root.join("project");
        std::fs::create_dir_all(project.join("src")).unwrap();
        std::fs::write(project.join("README.md"), "readme").unwrap();
        std::fs::write(project.join("src/main.rs"), "fn main() {}").unwrap();
        project
    }

    #[tokio::test]
    async fn test_zip_and_extract() {
        let dir = TempDir::new().unwrap();
        let project = sample_tree(dir.path());
        let archive = dir.path().join("out/project.zip");

        let summary = compress(&guard(), &[project.display().to_string()], &archive)
            .await
            .unwrap();
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.format, ArchiveFormat::Zip);

        let unpacked = dir.path().join("unpacked");
        let result = extract(&guard(), &archive, &unpacked).await.unwrap();
        assert_eq!(result.extracted, 2);
        assert_eq!(
            std::fs::read_to_string(unpacked.join("project/src/main.rs")).unwrap(),
            "fn main() {}"
        );
    }

    #[tokio::test]
    async fn test_tar_gz_and_extract() {
        let dir = TempDir::new().unwrap();
        let project = sample_tree(dir.path());
        let archive = dir.path().join("project.tgz");

        compress(&guard(), &[project.display().to_string()], &archive)
            .await
            .unwrap();
        let unpacked = dir.path().join("unpacked");
        let result = extract(&guard(), &archive, &unpacked).await.unwrap();
        assert_eq!(result.extracted, 2);
        assert!(unpacked.join("project/README.md").is_file());
    }

    #[tokio::test]
    async fn test_rejects_unknown_archive_format() {
        let dir = TempDir::new().unwrap();
        let project = sample_tree(dir.path());
        let err = compress(&guard(), &[project.display().to_string()], dir.path().join("x.rar"))
            .await
            .unwrap_err();
        assert!(matches!(err, OsError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_zip_slip_entries_are_skipped() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("evil.zip");
        {
            let mut writer = ZipWriter::new(File::create(&archive).unwrap());
            let options = FileOptions::default();
            writer.start_file("../escape.txt", options).unwrap();
            writer.write_all(b"nope").unwrap();
            writer.start_file("ok.txt", options).unwrap();
            writer.write_all(b"fine").unwrap();
            writer.finish().unwrap();
        }

        let dest = dir.path().join("dest");
        let result = extract(&guard(), &archive, &dest).await.unwrap();
        assert_eq!(result.extracted, 1);
        assert_eq!(result.skipped, vec!["../escape.txt".to_string()]);
        assert!(!dir.path().join("escape.txt").exists());
    }
}
