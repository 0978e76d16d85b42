//! Desktop helpers - opening files and URLs, screenshots, clipboard,
//! notifications and image compression.

use super::{blocking, command_exists, not_found, run_checked, OsError, OsResult};
use crate::sandbox::PathGuard;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct Screenshot {
    pub path: PathBuf,
    pub backend: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompressedImage {
    pub source: PathBuf,
    pub output: PathBuf,
    pub original_size: u64,
    pub compressed_size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClipboardText {
    pub content: String,
    pub length: usize,
}

fn validate_text(text: &str) -> OsResult<()> {
    if text.contains('\0') {
        return Err(OsError::InvalidArgument(
            "text contains null byte".to_string(),
        ));
    }
    Ok(())
}

/// Open a file or folder with the default application.
pub async fn open_path(guard: &PathGuard, path: impl AsRef<Path>) -> OsResult<PathBuf> {
    let path = guard.check(path)?;
    if !path.exists() {
        return Err(not_found(&path));
    }
    let target = path.clone();
    blocking(move || open::that_detached(&target).map_err(OsError::Io)).await?;
    Ok(path)
}

/// Open a URL in the default browser.
pub async fn open_url(url: &str) -> OsResult<String> {
    let url = super::network::with_scheme(url, "http");
    validate_text(&url)?;
    let target = url.clone();
    blocking(move || open::that_detached(&target).map_err(OsError::Io)).await?;
    Ok(url)
}

/// Capture the screen into `dir`, using the first backend found.
pub async fn capture_screen(dir: &Path, file_name: Option<&str>) -> OsResult<Screenshot> {
    let file_name = match file_name {
        Some(name) => {
            let name = Path::new(name)
                .file_name()
                .ok_or_else(|| OsError::InvalidArgument(format!("bad file name: {}", name)))?
                .to_string_lossy()
                .to_string();
            if Path::new(&name).extension().is_some() {
                name
            } else {
                format!("{}.png", name)
            }
        }
        None => format!(
            "screenshot_{}.png",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ),
    };
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    let target = path.to_string_lossy().to_string();

    if command_exists("grim").await {
        run_checked("grim", &[&target]).await?;
        return Ok(Screenshot { path, backend: "grim" });
    }
    if command_exists("scrot").await {
        run_checked("scrot", &["--overwrite", &target]).await?;
        return Ok(Screenshot { path, backend: "scrot" });
    }
    if command_exists("gnome-screenshot").await {
        run_checked("gnome-screenshot", &["-f", &target]).await?;
        return Ok(Screenshot {
            path,
            backend: "gnome-screenshot",
        });
    }
    if cfg!(target_os = "macos") {
        run_checked("screencapture", &["-x", &target]).await?;
        return Ok(Screenshot {
            path,
            backend: "screencapture",
        });
    }
    if cfg!(windows) {
        let script = format!(
            "Add-Type -AssemblyName System.Windows.Forms,System.Drawing; \
             $b = [System.Windows.Forms.Screen]::PrimaryScreen.Bounds; \
             $bmp = New-Object System.Drawing.Bitmap $b.Width, $b.Height; \
             $g = [System.Drawing.Graphics]::FromImage($bmp); \
             $g.CopyFromScreen($b.Location, [System.Drawing.Point]::Empty, $b.Size); \
             $bmp.Save('{}')",
            target.replace('\'', "''")
        );
        run_checked("powershell", &["-NoProfile", "-Command", &script]).await?;
        return Ok(Screenshot {
            path,
            backend: "powershell",
        });
    }

    Err(OsError::Unavailable(
        "No screenshot backend found (install 'grim', 'scrot' or 'gnome-screenshot')".to_string(),
    ))
}

/// `<stem>_compressed<ext>` next to the source.
pub fn compressed_image_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    source.with_file_name(format!("{}_compressed{}", stem, extension))
}

/// Recompress an image with ImageMagick at the given JPEG/WebP quality.
pub async fn compress_image(guard: &PathGuard, path: impl AsRef<Path>, quality: u8) -> OsResult<CompressedImage> {
    if !(1..=100).contains(&quality) {
        return Err(OsError::InvalidArgument(
            "quality must be between 1 and 100".to_string(),
        ));
    }
    let source = guard.check(path)?;
    if !source.is_file() {
        return Err(not_found(&source));
    }
    let output = guard.check(compressed_image_path(&source))?;

    let program = if command_exists("magick").await {
        "magick"
    } else if command_exists("convert").await {
        "convert"
    } else {
        return Err(OsError::Unavailable(
            "Image compression needs ImageMagick (install the 'imagemagick' package)".to_string(),
        ));
    };

    let quality = quality.to_string();
    let (src, out) = (source.to_string_lossy().to_string(), output.to_string_lossy().to_string());
    run_checked(program, &[&src, "-strip", "-quality", &quality, &out]).await?;

    Ok(CompressedImage {
        original_size: tokio::fs::metadata(&source).await?.len(),
        compressed_size: tokio::fs::metadata(&output).await?.len(),
        source,
        output,
    })
}

pub async fn record_screen() -> OsResult<PathBuf> {
    Err(OsError::Unavailable(
        "Screen recording is not built in; install OBS Studio or use 'wf-recorder'/'ffmpeg' directly"
            .to_string(),
    ))
}

pub async fn clipboard_get() -> OsResult<ClipboardText> {
    blocking(|| {
        let mut clipboard = arboard::Clipboard::new().map_err(clipboard_error)?;
        let content = clipboard.get_text().map_err(clipboard_error)?;
        Ok(ClipboardText {
            length: content.chars().count(),
            content,
        })
    })
    .await
}

pub async fn clipboard_set(text: &str) -> OsResult<usize> {
    validate_text(text)?;
    let text = text.to_string();
    blocking(move || {
        let mut clipboard = arboard::Clipboard::new().map_err(clipboard_error)?;
        let length = text.chars().count();
        clipboard.set_text(text).map_err(clipboard_error)?;
        Ok(length)
    })
    .await
}

fn clipboard_error(err: arboard::Error) -> OsError {
    match err {
        arboard::Error::ClipboardNotSupported => OsError::Unavailable(
            "Clipboard is not available in this session".to_string(),
        ),
        other => OsError::OperationFailed(format!("clipboard: {}", other)),
    }
}

/// Desktop notification via `notify-send`, `osascript` or PowerShell.
pub async fn send_notification(title: &str, message: &str) -> OsResult<()> {
    validate_text(title)?;
    validate_text(message)?;

    if cfg!(target_os = "macos") {
        let script = format!(
            "display notification {:?} with title {:?}",
            message, title
        );
        return run_checked("osascript", &["-e", &script]).await;
    }
    if cfg!(windows) {
        let escape = |s: &str| s.replace('\'', "''");
        let script = format!(
            "[Windows.UI.Notifications.ToastNotificationManager, Windows.UI.Notifications, ContentType = WindowsRuntime] > $null; \
             $t = [Windows.UI.Notifications.ToastNotificationManager]::GetTemplateContent([Windows.UI.Notifications.ToastTemplateType]::ToastText02); \
             $x = $t.GetElementsByTagName('text'); \
             $x.Item(0).AppendChild($t.CreateTextNode('{}')) > $null; \
             $x.Item(1).AppendChild($t.CreateTextNode('{}')) > $null; \
             [Windows.UI.Notifications.ToastNotificationManager]::CreateToastNotifier('desk-agent').Show([Windows.UI.Notifications.ToastNotification]::new($t))",
            escape(title),
            escape(message)
        );
        return run_checked("powershell", &["-NoProfile", "-Command", &script]).await;
    }
    if command_exists("notify-send").await {
        return run_checked("notify-send", &["--", title, message]).await;
    }
    Err(OsError::Unavailable(
        "Notifications need 'notify-send' (install libnotify)".to_string(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_image_path() {
        assert_eq!(
            compressed_image_path(Path::new("/pics/cat.jpg")),
            PathBuf::from("/pics/cat_compressed.jpg")
        );
    }

    #[tokio::test]
    async fn test_record_screen_is_unavailable() {
        let err = record_screen().await.unwrap_err();
        assert!(matches!(err, OsError::Unavailable(_)));
        assert!(err.to_string().contains("install"));
    }

    #[tokio::test]
    async fn test_compress_image_validates_quality() {
        let guard = PathGuard::new(["/proc"]);
        assert!(matches!(
            compress_image(&guard, "/tmp/x.jpg", 0).await,
            Err(OsError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_open_path_missing() {
        let guard = PathGuard::new(["/proc"]);
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            open_path(&guard, dir.path().join("missing.pdf")).await,
            Err(OsError::NotFound(_))
        ));
    }
}
