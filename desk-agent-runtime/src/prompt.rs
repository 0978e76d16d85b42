//! System prompt sent ahead of every conversation.

use crate::commands::meta::catalogue_listing;
use crate::commands::CommandRegistry;
use chrono::{DateTime, Local};

pub const AGENT_NAME: &str = "Desk Agent";

const RULES: &str = "\
1. Be polite, helpful and clear.
2. Warn the user before anything destructive (deleting, killing, overwriting).
3. Explain command results in plain language.
4. Use the context from earlier commands.
5. Remember important details about the user and their system.";

const MARKER_FORMAT: &str = r#"To run a command, answer with exactly one call in this format:
to=functions.<command> <|message|>{JSON arguments}
(to=browser.<command> is accepted too)

Examples:
- Open a site: to=browser.open_webpage <|message|>{"url": "https://example.com"}
- Calculate: to=functions.calculator <|message|>{"expression": "2 + 2 * 2"}
- Find files: to=functions.search_files <|message|>{"directory": "/home/user", "pattern": "*.txt"}

Calls for open_webpage, calculator, search_files, read_file and list_directory are executed automatically. Ask the user to type other commands themselves."#;

/// Prompt describing the agent, the host and every registered command.
pub fn build_system_prompt(registry: &CommandRegistry, now: DateTime<Local>, os: &str) -> String {
    format!(
        "You are {name}, an assistant that manages this computer for the user.\n\
         Current date and time: {now}\n\
         Operating system: {os}\n\n\
         AVAILABLE COMMANDS:\n{commands}\n\n\
         RULES:\n{rules}\n\n\
         COMMAND EXECUTION:\n{format}\n",
        name = AGENT_NAME,
        now = now.format("%Y-%m-%d %H:%M:%S"),
        os = os,
        commands = catalogue_listing(&registry.specs()),
        rules = RULES,
        format = MARKER_FORMAT,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_prompt_lists_commands_and_markers() {
        let registry = CommandRegistry::with_defaults();
        let now = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let prompt = build_system_prompt(&registry, now, "Linux 6.8");

        assert!(prompt.contains(AGENT_NAME));
        assert!(prompt.contains("2024-05-01 09:30:00"));
        assert!(prompt.contains("Linux 6.8"));
        assert!(prompt.contains("read_file <path>"));
        assert!(prompt.contains("Desktop and media:"));
        assert!(prompt.contains("to=functions.calculator <|message|>"));
        for spec in registry.specs() {
            assert!(prompt.contains(spec.usage), "missing {}", spec.name);
        }
    }
}
