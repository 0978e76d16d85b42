//! Human-readable formatting shared by command output and the HTTP facade.

use chrono::{DateTime, Local};
use std::time::SystemTime;

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

pub fn kilobytes(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / KIB)
}

pub fn megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / MIB)
}

pub fn gigabytes(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / GIB)
}

pub fn percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Local timestamp as `YYYY-mm-dd HH:MM:SS`.
pub fn local_timestamp(time: SystemTime) -> String {
    let datetime: DateTime<Local> = time.into();
    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn now_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Uptime as `Hh MMm SSs`, or `Dd Hh MMm` past one day.
pub fn duration_hms(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if days > 0 {
        format!("{}d {}h {:02}m", days, hours, minutes)
    } else {
        format!("{}h {:02}m {:02}s", hours, minutes, secs)
    }
}

/// Truncate to at most `max_chars` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(megabytes(0), "0.00 MB");
        assert_eq!(megabytes(1024 * 1024 * 3 / 2), "1.50 MB");
        assert_eq!(kilobytes(2048), "2.00 KB");
        assert_eq!(gigabytes(1024 * 1024 * 1024), "1.00 GB");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("привіт", 3), "при");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_duration() {
        assert_eq!(duration_hms(3725), "1h 02m 05s");
        assert_eq!(duration_hms(90_061), "1d 1h 01m");
    }
}
