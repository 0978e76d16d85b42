//! Extraction of one embedded function-call marker from a model reply.
//!
//! The model is asked to emit calls as
//! `to=functions.<name> <|message|> {json}`. Only the first marker counts,
//! and only a handful of read-mostly commands are executed from it.

use crate::dispatcher::{CommandDispatcher, DispatchOutcome};
use crate::interfaces::RuntimeError;
use crate::tokenizer;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{info, warn};

pub const MARKER_PATTERN: &str = r"(?s)to=(?:functions|browser)\.(\w+)\s*<\|message\|>\s*(\{.*?\})";

/// What a reply asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerAction {
    /// No marker; the reply stands as is.
    None,
    /// A marker whose arguments are not valid JSON.
    InvalidArguments { name: String },
    /// A well-formed marker that is not executed.
    Acknowledge { name: String, arguments: String },
    /// A command line to dispatch.
    Execute { line: String },
}

/// Text shown to the user after post-processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedReply {
    pub text: String,
    pub success: bool,
}

pub struct ResponsePostProcessor {
    marker: Regex,
}

impl ResponsePostProcessor {
    pub fn new() -> Result<Self, RuntimeError> {
        let marker = Regex::new(MARKER_PATTERN)
            .map_err(|e| RuntimeError::ConfigError(format!("invalid marker pattern: {}", e)))?;
        Ok(Self { marker })
    }

    /// Classify `reply` without running anything.
    pub fn parse(&self, reply: &str) -> MarkerAction {
        let Some(captures) = self.marker.captures(reply) else {
            return MarkerAction::None;
        };
        let name = captures[1].to_string();
        let raw = &captures[2];

        let arguments: Map<String, Value> = match serde_json::from_str(raw) {
            Ok(Value::Object(map)) => map,
            _ => return MarkerAction::InvalidArguments { name },
        };

        match follow_up_line(&name, &arguments) {
            Some(line) => MarkerAction::Execute { line },
            None => MarkerAction::Acknowledge {
                name,
                arguments: raw.to_string(),
            },
        }
    }

    /// Run the marker (if any) through `dispatcher` and produce the final text.
    pub async fn process(&self, reply: &str, dispatcher: &CommandDispatcher) -> ProcessedReply {
        match self.parse(reply) {
            MarkerAction::None => ProcessedReply {
                text: reply.to_string(),
                success: true,
            },
            MarkerAction::InvalidArguments { name } => {
                warn!("Model emitted unparsable arguments for {}", name);
                ProcessedReply {
                    text: format!("❌ Failed to parse JSON arguments for command {}", name),
                    success: false,
                }
            }
            MarkerAction::Acknowledge { name, arguments } => ProcessedReply {
                text: format!("✅ Command '{}' recognized: {}", name, arguments),
                success: true,
            },
            MarkerAction::Execute { line } => {
                info!("Executing model request: {}", line);
                match dispatcher.dispatch(&line).await {
                    DispatchOutcome::Handled { text, success } => ProcessedReply { text, success },
                    DispatchOutcome::Usage(text) => ProcessedReply {
                        text,
                        success: false,
                    },
                    DispatchOutcome::Unrecognized => ProcessedReply {
                        text: reply.to_string(),
                        success: true,
                    },
                }
            }
        }
    }
}

/// String form of a scalar argument; objects, arrays and null do not count.
fn scalar(arguments: &Map<String, Value>, key: &str) -> Option<String> {
    match arguments.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Command line for an allow-listed call, or `None`.
fn follow_up_line(name: &str, arguments: &Map<String, Value>) -> Option<String> {
    let words: Vec<String> = match name {
        "open_webpage" => vec![name.to_string(), scalar(arguments, "url")?],
        "calculator" => vec![name.to_string(), scalar(arguments, "expression")?],
        "search_files" => vec![
            name.to_string(),
            scalar(arguments, "directory")?,
            scalar(arguments, "pattern").unwrap_or_else(|| "*".to_string()),
        ],
        "read_file" | "list_directory" => vec![name.to_string(), scalar(arguments, "path")?],
        _ => return None,
    };
    Some(tokenizer::join(&words))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn processor() -> ResponsePostProcessor {
        ResponsePostProcessor::new().unwrap()
    }

    #[test]
    fn test_plain_reply_has_no_marker() {
        assert_eq!(processor().parse("The answer is 42."), MarkerAction::None);
    }

    #[test]
    fn test_read_file_marker() {
        let reply = r#"Let me look.<|channel|>commentary to=functions.read_file <|message|> {"path": "notes.txt"}"#;
        assert_eq!(
            processor().parse(reply),
            MarkerAction::Execute {
                line: "read_file notes.txt".to_string()
            }
        );
    }

    #[test]
    fn test_paths_with_spaces_survive() {
        let reply = r#"to=functions.search_files<|message|>{"directory": "/home/me/My Files"}"#;
        let MarkerAction::Execute { line } = processor().parse(reply) else {
            panic!("expected execution");
        };
        assert_eq!(
            tokenizer::tokenize(&line).unwrap(),
            vec!["search_files", "/home/me/My Files", "*"]
        );
    }

    #[test]
    fn test_browser_namespace_and_multiline() {
        let reply = "to=browser.open_webpage\n<|message|>\n{\n  \"url\": \"example.com\"\n}";
        assert_eq!(
            processor().parse(reply),
            MarkerAction::Execute {
                line: "open_webpage example.com".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_or_incomplete_is_acknowledged() {
        let reply = r#"to=functions.delete_file <|message|> {"path": "/tmp/x"}"#;
        assert_eq!(
            processor().parse(reply),
            MarkerAction::Acknowledge {
                name: "delete_file".to_string(),
                arguments: r#"{"path": "/tmp/x"}"#.to_string()
            }
        );

        let reply = r#"to=functions.read_file <|message|> {"file": "x.txt"}"#;
        assert!(matches!(
            processor().parse(reply),
            MarkerAction::Acknowledge { .. }
        ));
    }

    #[test]
    fn test_bad_json() {
        let reply = r#"to=functions.calculator <|message|> {expression: 2+2}"#;
        assert_eq!(
            processor().parse(reply),
            MarkerAction::InvalidArguments {
                name: "calculator".to_string()
            }
        );
    }

    #[test]
    fn test_only_first_marker_counts() {
        let reply = concat!(
            r#"to=functions.calculator <|message|> {"expression": "1+1"} "#,
            r#"to=functions.read_file <|message|> {"path": "a"}"#
        );
        assert_eq!(
            processor().parse(reply),
            MarkerAction::Execute {
                line: "calculator 1+1".to_string()
            }
        );
    }
}
