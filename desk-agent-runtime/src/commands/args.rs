//! Argument helpers shared by command handlers.

use crate::interfaces::CommandError;
use std::str::FromStr;

/// Parse `args[index]` as a number, falling back to `default` when absent.
pub fn number_or<T: FromStr>(args: &[String], index: usize, field: &str, default: T) -> Result<T, CommandError> {
    match args.get(index) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CommandError::Usage(format!("{} must be a number", field))),
        None => Ok(default),
    }
}

/// Parse a required numeric argument.
pub fn number<T: FromStr>(args: &[String], index: usize, field: &str) -> Result<T, CommandError> {
    let raw = args
        .get(index)
        .ok_or_else(|| CommandError::Usage(format!("{} is required", field)))?;
    raw.trim()
        .parse()
        .map_err(|_| CommandError::Usage(format!("{} must be a number", field)))
}

/// The argument at `index`, or an empty string.
pub fn arg(args: &[String], index: usize) -> &str {
    args.get(index).map(String::as_str).unwrap_or("")
}

/// Words from `from` onwards joined by single spaces.
pub fn rest(args: &[String], from: usize) -> String {
    args.get(from..).map(|words| words.join(" ")).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_number_or_default_and_error() {
        let args = words(&["/tmp", "abc"]);
        assert_eq!(number_or::<u64>(&args, 2, "days", 365).unwrap(), 365);
        assert_eq!(
            number_or::<u64>(&args, 1, "days", 365).unwrap_err(),
            CommandError::Usage("days must be a number".into())
        );
    }

    #[test]
    fn test_rest_joins_tail() {
        let args = words(&["title", "hello", "world"]);
        assert_eq!(rest(&args, 1), "hello world");
        assert_eq!(rest(&args, 3), "");
        assert_eq!(rest(&args, 9), "");
    }
}
