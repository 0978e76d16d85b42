//! Screenshots, images, clipboard and notifications.

use super::args::{self, arg};
use super::{Category, Command, CommandContext, CommandRegistry, CommandSpec};
use crate::interfaces::CommandError;
use async_trait::async_trait;
use desk_agent_core::display;
use desk_agent_tools::os_capabilities::desktop;
use std::sync::Arc;

/// Characters of clipboard text shown by `clipboard_get`.
pub const CLIPBOARD_PREVIEW_CHARS: usize = 200;

pub fn register(registry: &mut CommandRegistry) {
    registry
        .register(Arc::new(TakeScreenshot))
        .register(Arc::new(CompressImage))
        .register(Arc::new(RecordScreen))
        .register(Arc::new(ClipboardGet))
        .register(Arc::new(ClipboardSet))
        .register(Arc::new(SendNotification));
}

pub struct TakeScreenshot;

#[async_trait]
impl Command for TakeScreenshot {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "take_screenshot",
            Category::Desktop,
            0,
            "take_screenshot [filename]",
            "Capture the screen into the screenshots folder",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let dir = ctx.config.paths.screenshots();
        let shot = desktop::capture_screen(&dir, args.first().map(String::as_str)).await?;
        Ok(format!(
            "📸 Screenshot saved to {} (via {})",
            shot.path.display(),
            shot.backend
        ))
    }
}

pub struct CompressImage;

#[async_trait]
impl Command for CompressImage {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "compress_image",
            Category::Desktop,
            1,
            "compress_image <path> [quality=85]",
            "Re-encode an image at lower quality",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let quality: u8 = args::number_or(args, 1, "quality", 85)?;
        if !(1..=100).contains(&quality) {
            return Err(CommandError::Usage("quality must be between 1 and 100".to_string()));
        }
        let image = desktop::compress_image(&ctx.guard, arg(args, 0), quality).await?;
        let saved = image.original_size.saturating_sub(image.compressed_size);
        Ok(format!(
            "🖼️ {} → {}\n  {} → {} (saved {})",
            image.source.display(),
            image.output.display(),
            display::kilobytes(image.original_size),
            display::kilobytes(image.compressed_size),
            display::kilobytes(saved)
        ))
    }
}

pub struct RecordScreen;

#[async_trait]
impl Command for RecordScreen {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "record_screen",
            Category::Desktop,
            0,
            "record_screen",
            "Screen recording (needs an external recorder)",
        )
    }

    async fn run(&self, _ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let path = desktop::record_screen().await?;
        Ok(format!("🎥 Recording saved to {}", path.display()))
    }
}

pub struct ClipboardGet;

#[async_trait]
impl Command for ClipboardGet {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "clipboard_get",
            Category::Desktop,
            0,
            "clipboard_get",
            "Show the clipboard text",
        )
    }

    async fn run(&self, _ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let clip = desktop::clipboard_get().await?;
        let preview = display::truncate_chars(&clip.content, CLIPBOARD_PREVIEW_CHARS);
        let ellipsis = if clip.length > CLIPBOARD_PREVIEW_CHARS { "..." } else { "" };
        Ok(format!(
            "📋 Clipboard ({} characters):\n{}{}",
            clip.length, preview, ellipsis
        ))
    }
}

pub struct ClipboardSet;

#[async_trait]
impl Command for ClipboardSet {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "clipboard_set",
            Category::Desktop,
            1,
            "clipboard_set <text...>",
            "Put text on the clipboard",
        )
    }

    async fn run(&self, _ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let length = desktop::clipboard_set(&args::rest(args, 0)).await?;
        Ok(format!("📋 Copied {} characters to the clipboard", length))
    }
}

pub struct SendNotification;

#[async_trait]
impl Command for SendNotification {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "send_notification",
            Category::Desktop,
            2,
            "send_notification <title> <message...>",
            "Show a desktop notification",
        )
    }

    async fn run(&self, _ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let title = arg(args, 0);
        desktop::send_notification(title, &args::rest(args, 1)).await?;
        Ok(format!("🔔 Notification sent: {}", title))
    }
}
