//! File and folder commands.

use super::args::{self, arg};
use super::{Category, Command, CommandContext, CommandRegistry, CommandSpec};
use crate::interfaces::CommandError;
use async_trait::async_trait;
use desk_agent_core::display;
use desk_agent_infra::infra::agent_store::FileIndexEntry;
use desk_agent_tools::os_capabilities::hashing::{self, HashAlgorithm};
use desk_agent_tools::os_capabilities::{desktop, filesystem, search};
use serde_json::json;
use std::fmt::Write;
use std::sync::Arc;
use tracing::info;

pub fn register(registry: &mut CommandRegistry) {
    registry
        .register(Arc::new(ReadFile))
        .register(Arc::new(SearchFiles))
        .register(Arc::new(OpenFile))
        .register(Arc::new(CopyFile))
        .register(Arc::new(MoveFile))
        .register(Arc::new(DeleteFile))
        .register(Arc::new(CreateFolder))
        .register(Arc::new(ListDirectory))
        .register(Arc::new(FileInfoCommand))
        .register(Arc::new(SearchInFiles))
        .register(Arc::new(GetFileHash))
        .register(Arc::new(FindLargeFiles))
        .register(Arc::new(FindDuplicates))
        .register(Arc::new(FindOldFiles))
        .register(Arc::new(AnalyzeFolder))
        .register(Arc::new(IndexDirectory))
        .register(Arc::new(SearchIndex));
}

pub struct ReadFile;

#[async_trait]
impl Command for ReadFile {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "read_file",
            Category::Files,
            1,
            "read_file <path>",
            "Show the contents of a text file",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let limits = &ctx.config.limits;
        let file = filesystem::read_file(&ctx.guard, arg(args, 0), limits.max_file_size).await?;

        ctx.remember_context(
            "file_access",
            &format!("Read file: {}", file.path.display()),
            5,
        );

        let total_chars = file.content.chars().count();
        let preview = display::truncate_chars(&file.content, limits.file_preview_chars);
        let mut out = format!(
            "📄 {} ({})\n\n{}",
            file.path.display(),
            display::kilobytes(file.size),
            preview
        );
        if total_chars > limits.file_preview_chars {
            let _ = write!(
                out,
                "\n\n... [truncated, showing {} of {} characters]",
                limits.file_preview_chars, total_chars
            );
        }
        Ok(out)
    }
}

pub struct SearchFiles;

#[async_trait]
impl Command for SearchFiles {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "search_files",
            Category::Files,
            1,
            "search_files <directory> [.ext|pattern]",
            "Find files by extension or name pattern",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let filter = args.get(1).map(String::as_str);
        let found = search::search_files(
            &ctx.guard,
            arg(args, 0),
            filter,
            ctx.config.limits.max_search_results,
        )
        .await?;

        if found.is_empty() {
            return Ok(format!("🔍 No files matching '{}' found", filter.unwrap_or("*")));
        }
        let mut out = format!("🔍 Found {} file(s):\n", found.len());
        for file in &found {
            let _ = writeln!(
                out,
                "  {} ({}, modified {})",
                file.path.display(),
                display::kilobytes(file.size),
                file.modified
            );
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct OpenFile;

#[async_trait]
impl Command for OpenFile {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "open_file",
            Category::Files,
            1,
            "open_file <path>",
            "Open a file with its default application",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let path = desktop::open_path(&ctx.guard, arg(args, 0)).await?;
        Ok(format!("✅ Opened {}", path.display()))
    }
}

pub struct CopyFile;

#[async_trait]
impl Command for CopyFile {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "copy_file",
            Category::Files,
            2,
            "copy_file <source> <destination>",
            "Copy a file",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let target = filesystem::copy_file(&ctx.guard, arg(args, 0), arg(args, 1)).await?;
        Ok(format!("✅ Copied {} to {}", arg(args, 0), target.display()))
    }
}

pub struct MoveFile;

#[async_trait]
impl Command for MoveFile {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "move_file",
            Category::Files,
            2,
            "move_file <source> <destination>",
            "Move or rename a file or folder",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let target = filesystem::move_path(&ctx.guard, arg(args, 0), arg(args, 1)).await?;
        Ok(format!("✅ Moved {} to {}", arg(args, 0), target.display()))
    }
}

pub struct DeleteFile;

#[async_trait]
impl Command for DeleteFile {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "delete_file",
            Category::Files,
            1,
            "delete_file <path>",
            "Delete a file or a whole folder",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let removed = filesystem::delete_path(&ctx.guard, arg(args, 0)).await?;
        info!("Deleted {}", removed.display());
        ctx.remember_context("file_operation", &format!("Deleted: {}", removed.display()), 7);
        Ok(format!("🗑️ Deleted {}", removed.display()))
    }
}

pub struct CreateFolder;

#[async_trait]
impl Command for CreateFolder {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "create_folder",
            Category::Files,
            1,
            "create_folder <path>",
            "Create a folder and any missing parents",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let created = filesystem::create_folder(&ctx.guard, arg(args, 0)).await?;
        Ok(format!("📁 Created folder {}", created.display()))
    }
}

pub struct ListDirectory;

#[async_trait]
impl Command for ListDirectory {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "list_directory",
            Category::Files,
            1,
            "list_directory <path>",
            "List the entries of a folder",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let entries = filesystem::list_directory(&ctx.guard, arg(args, 0)).await?;
        if entries.is_empty() {
            return Ok(format!("📂 {} is empty", arg(args, 0)));
        }

        let mut out = format!("📂 {} ({} entries):\n", arg(args, 0), entries.len());
        for entry in &entries {
            if entry.is_dir {
                let _ = writeln!(out, "  📁 {}/", entry.name);
            } else {
                let _ = writeln!(
                    out,
                    "  📄 {} ({}, {})",
                    entry.name,
                    display::kilobytes(entry.size),
                    entry.modified
                );
            }
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct FileInfoCommand;

#[async_trait]
impl Command for FileInfoCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "file_info",
            Category::Files,
            1,
            "file_info <path>",
            "Show size, timestamps and type of a file",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let info = filesystem::file_info(&ctx.guard, arg(args, 0)).await?;
        let unknown = || "unknown".to_string();
        Ok(format!(
            "ℹ️ {}\n  Path: {}\n  Size: {} ({} bytes)\n  Created: {}\n  Modified: {}\n  Accessed: {}\n  Extension: {}\n  Type: {}\n  Kind: {}",
            info.name,
            info.path.display(),
            display::megabytes(info.size),
            info.size,
            info.created.clone().unwrap_or_else(unknown),
            info.modified.clone().unwrap_or_else(unknown),
            info.accessed.clone().unwrap_or_else(unknown),
            if info.extension.is_empty() { "none" } else { info.extension.as_str() },
            info.mime_type,
            if info.is_directory { "directory" } else { "file" },
        ))
    }
}

pub struct SearchInFiles;

#[async_trait]
impl Command for SearchInFiles {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "search_in_files",
            Category::Files,
            2,
            "search_in_files <directory> <text> [.ext ...]",
            "Find lines containing text, case-insensitively",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let text = arg(args, 1);
        let extensions: Vec<String> = args.iter().skip(2).cloned().collect();
        let matches = search::search_in_files(
            &ctx.guard,
            arg(args, 0),
            text,
            &extensions,
            ctx.config.limits.max_search_results,
        )
        .await?;

        if matches.is_empty() {
            return Ok(format!("🔍 '{}' not found", text));
        }
        let mut out = format!("🔍 {} match(es) for '{}':\n", matches.len(), text);
        for hit in &matches {
            let _ = writeln!(
                out,
                "  {}:{}: {}",
                hit.file.display(),
                hit.line_number,
                hit.line.trim()
            );
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct GetFileHash;

#[async_trait]
impl Command for GetFileHash {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "get_file_hash",
            Category::Files,
            1,
            "get_file_hash <path> [md5|sha1|sha224|sha256|sha384|sha512]",
            "Compute a file checksum (sha256 by default)",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let algorithm = match args.get(1) {
            Some(name) => name.parse::<HashAlgorithm>()?,
            None => HashAlgorithm::default(),
        };
        let digest = hashing::hash_file(&ctx.guard, arg(args, 0), algorithm).await?;
        Ok(format!(
            "🔐 {} {}\n  {}: {}",
            digest.path.display(),
            display::kilobytes(digest.size),
            digest.algorithm,
            digest.hash
        ))
    }
}

pub struct FindLargeFiles;

#[async_trait]
impl Command for FindLargeFiles {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "find_large_files",
            Category::Files,
            1,
            "find_large_files <directory> [min_mb=100]",
            "List files above a size threshold, largest first",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let min_mb: u64 = args::number_or(args, 1, "min_mb", 100)?;
        let report = search::find_large_files(
            &ctx.guard,
            arg(args, 0),
            min_mb,
            ctx.config.limits.max_search_results,
        )
        .await?;

        if report.files.is_empty() {
            return Ok(format!("📦 No files larger than {} MB", report.min_size_mb));
        }
        let mut out = format!(
            "📦 {} file(s) larger than {} MB:\n",
            report.count, report.min_size_mb
        );
        for file in &report.files {
            let _ = writeln!(out, "  {} {}", display::megabytes(file.size), file.path.display());
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct FindDuplicates;

#[async_trait]
impl Command for FindDuplicates {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "find_duplicates",
            Category::Files,
            1,
            "find_duplicates <directory>",
            "Group files with identical content",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let report = search::find_duplicates(&ctx.guard, arg(args, 0)).await?;
        if report.groups.is_empty() {
            return Ok("✅ No duplicate files found".to_string());
        }

        let mut out = format!(
            "👥 {} group(s), {} duplicate file(s), {} wasted:\n",
            report.groups.len(),
            report.duplicate_files,
            display::megabytes(report.wasted_bytes)
        );
        for group in &report.groups {
            let _ = writeln!(out, "  [{}]", &group.hash[..group.hash.len().min(8)]);
            for file in &group.files {
                let _ = writeln!(out, "    {}", file.path.display());
            }
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct FindOldFiles;

#[async_trait]
impl Command for FindOldFiles {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "find_old_files",
            Category::Files,
            1,
            "find_old_files <directory> [days=365]",
            "List files not modified for a number of days",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let days: u64 = args::number_or(args, 1, "days", 365)?;
        let mut files = search::find_old_files(&ctx.guard, arg(args, 0), days).await?;
        if files.is_empty() {
            return Ok(format!("✅ No files older than {} days", days));
        }

        let total = files.len();
        let limit = ctx.config.limits.max_search_results;
        files.truncate(limit);
        let mut out = format!("🕰️ {} file(s) older than {} days:\n", total, days);
        for file in &files {
            let _ = writeln!(
                out,
                "  {} ({}, {})",
                file.path.display(),
                file.modified,
                display::kilobytes(file.size)
            );
        }
        if total > limit {
            let _ = write!(out, "  ... and {} more", total - limit);
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct AnalyzeFolder;

#[async_trait]
impl Command for AnalyzeFolder {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "analyze_folder",
            Category::Files,
            1,
            "analyze_folder <directory>",
            "Summarize file counts, types and largest files",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let analysis = search::analyze_folder(&ctx.guard, arg(args, 0)).await?;

        let mut out = format!(
            "📊 {}\n  Files: {}\n  Total size: {}\n  Types:\n",
            arg(args, 0),
            analysis.total_files,
            display::megabytes(analysis.total_size)
        );
        let mut types: Vec<(&String, &usize)> = analysis.file_types.iter().collect();
        types.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (extension, count) in types {
            let label = if extension.is_empty() { "(none)" } else { extension };
            let _ = writeln!(out, "    {}: {}", label, count);
        }
        out.push_str("  Largest:\n");
        for file in &analysis.largest_files {
            let _ = writeln!(out, "    {} {}", display::megabytes(file.size), file.path.display());
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct IndexDirectory;

#[async_trait]
impl Command for IndexDirectory {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "index_directory",
            Category::Files,
            1,
            "index_directory <directory>",
            "Record every file of a folder in the search index",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let candidates = search::scan_for_index(&ctx.guard, arg(args, 0)).await?;
        let entries: Vec<FileIndexEntry> = candidates
            .into_iter()
            .map(|c| FileIndexEntry {
                filepath: c.filepath,
                filename: c.filename,
                extension: c.extension,
                size: c.size,
                modified_date: c.modified_date,
                hash: c.hash,
                tags: c.tags,
            })
            .collect();
        let indexed = ctx.store.upsert_file_index(&entries)?;
        info!("Indexed {} files under {}", indexed, arg(args, 0));
        ctx.store.add_context(
            "indexing",
            &format!("Indexed directory: {}", arg(args, 0)),
            Some(&json!({ "files": indexed })),
            4,
        )?;
        Ok(format!("🗂️ Indexed {} file(s) from {}", indexed, arg(args, 0)))
    }
}

pub struct SearchIndex;

#[async_trait]
impl Command for SearchIndex {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "search_index",
            Category::Files,
            1,
            "search_index <query>",
            "Search indexed files by name or tag",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let query = args::rest(args, 0);
        let hits = ctx
            .store
            .search_file_index(&query, ctx.config.limits.max_search_results)?;
        if hits.is_empty() {
            return Ok(format!("🔍 Nothing in the index matches '{}'", query));
        }
        let mut out = format!("🔍 {} indexed file(s) match '{}':\n", hits.len(), query);
        for hit in &hits {
            let _ = writeln!(out, "  {} ({})", hit.filepath, display::kilobytes(hit.size));
        }
        Ok(out.trim_end().to_string())
    }
}
