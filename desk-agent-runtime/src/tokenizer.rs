//! Shell-style splitting of input lines.

use std::borrow::Cow;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not parse command: {0}")]
pub struct TokenizeError(pub String);

/// Split `line` into words. Single and double quotes group words; a
/// backslash is an ordinary character so Windows paths pass through intact.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    shell_words::split(&literal_backslashes(line)).map_err(|e| TokenizeError(e.to_string()))
}

/// Double every backslash that `shell_words` would read as an escape, i.e.
/// everything outside single quotes.
fn literal_backslashes(line: &str) -> Cow<'_, str> {
    if !line.contains('\\') {
        return Cow::Borrowed(line);
    }
    let mut out = String::with_capacity(line.len() + 8);
    let mut single = false;
    let mut double = false;
    for c in line.chars() {
        match c {
            '\'' if !double => single = !single,
            '"' if !single => double = !double,
            '\\' if !single => out.push('\\'),
            _ => {}
        }
        out.push(c);
    }
    Cow::Owned(out)
}

fn is_plain(word: &str) -> bool {
    !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ',' | '.' | '_' | '+' | ':' | '@' | '%' | '/' | '-' | '='))
}

/// Rebuild a command line that [`tokenize`] splits back into `words`.
/// Quoting only uses single quotes, with embedded `'` wrapped in double quotes.
pub fn join<I, S>(words: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = String::new();
    for (index, word) in words.into_iter().enumerate() {
        let word = word.as_ref();
        if index > 0 {
            line.push(' ');
        }
        if is_plain(word) {
            line.push_str(word);
            continue;
        }
        line.push('\'');
        for c in word.chars() {
            if c == '\'' {
                line.push_str("'\"'\"'");
            } else {
                line.push(c);
            }
        }
        line.push('\'');
    }
    line
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_quotes_group_words() {
        let words = tokenize(r#"read_file "My Documents/a b.txt""#).unwrap();
        assert_eq!(words, vec!["read_file", "My Documents/a b.txt"]);

        let words = tokenize("remember  city   'New York'").unwrap();
        assert_eq!(words, vec!["remember", "city", "New York"]);
    }

    #[test]
    fn test_empty_line() {
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn test_unterminated_quote_is_error() {
        let err = tokenize(r#"read_file "oops"#).unwrap_err();
        assert!(err.to_string().starts_with("Could not parse command"));
    }

    #[test]
    fn test_join_round_trips_spaces() {
        let line = join(["search_files", "/tmp/My Files", "*.txt"]);
        assert_eq!(
            tokenize(&line).unwrap(),
            vec!["search_files", "/tmp/My Files", "*.txt"]
        );
    }

    #[test]
    fn test_backslashes_are_literal() {
        let words = tokenize(r"read_file C:\Users\me\notes.txt").unwrap();
        assert_eq!(words, vec!["read_file", r"C:\Users\me\notes.txt"]);

        let words = tokenize(r#"list_files "C:\Program Files\App" 'D:\x y'"#).unwrap();
        assert_eq!(words, vec!["list_files", r"C:\Program Files\App", r"D:\x y"]);

        let words = tokenize(r"search_files \\server\share *.txt").unwrap();
        assert_eq!(words, vec!["search_files", r"\\server\share", "*.txt"]);
    }

    #[test]
    fn test_join_round_trips_awkward_words() {
        let words = [
            "read_file",
            r"C:\Users\me\My Notes\a.txt",
            "it's",
            r#"say "hi""#,
            "",
            r"trailing\",
        ];
        assert_eq!(tokenize(&join(words)).unwrap(), words);
        assert_eq!(join(["read_file", "notes.txt"]), "read_file notes.txt");
    }
}
