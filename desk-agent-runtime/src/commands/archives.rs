//! Zip and tarball packing.

use super::args::arg;
use super::{Category, Command, CommandContext, CommandRegistry, CommandSpec};
use crate::interfaces::CommandError;
use async_trait::async_trait;
use desk_agent_core::display;
use desk_agent_tools::os_capabilities::archive::{self, ArchiveFormat};
use std::sync::Arc;

pub fn register(registry: &mut CommandRegistry) {
    registry
        .register(Arc::new(CompressArchive))
        .register(Arc::new(ExtractArchive));
}

fn format_name(format: ArchiveFormat) -> &'static str {
    match format {
        ArchiveFormat::Zip => "zip",
        ArchiveFormat::TarGz => "tar.gz",
        ArchiveFormat::Tar => "tar",
    }
}

pub struct CompressArchive;

#[async_trait]
impl Command for CompressArchive {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "compress_archive",
            Category::Archives,
            2,
            "compress_archive <source...> <archive.zip|archive.tar.gz>",
            "Pack files and folders into an archive",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let (archive_path, sources) = match args.split_last() {
            Some(split) => split,
            None => return Err(CommandError::Usage("archive path is required".to_string())),
        };
        let summary = archive::compress(&ctx.guard, sources, archive_path).await?;
        Ok(format!(
            "📦 Created {} archive {} ({} entries, {})",
            format_name(summary.format),
            summary.archive.display(),
            summary.entries,
            display::megabytes(summary.size)
        ))
    }
}

pub struct ExtractArchive;

#[async_trait]
impl Command for ExtractArchive {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "extract_archive",
            Category::Archives,
            2,
            "extract_archive <archive> <destination>",
            "Unpack a .zip, .tar.gz or .tar archive",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let summary = archive::extract(&ctx.guard, arg(args, 0), arg(args, 1)).await?;
        let mut out = format!(
            "📂 Extracted {} entr{} into {}",
            summary.extracted,
            if summary.extracted == 1 { "y" } else { "ies" },
            summary.destination.display()
        );
        if !summary.skipped.is_empty() {
            out.push_str(&format!(
                "\n  ⚠️ Skipped {} unsafe entr{}: {}",
                summary.skipped.len(),
                if summary.skipped.len() == 1 { "y" } else { "ies" },
                summary.skipped.join(", ")
            ));
        }
        Ok(out)
    }
}
