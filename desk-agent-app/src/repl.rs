//! Interactive loop over stdin.

use desk_agent_runtime::Agent;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// What the loop should do with one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplAction<'a> {
    Skip,
    Exit,
    ClearScreen,
    ResetConversation,
    Ask(&'a str),
}

pub fn classify(input: &str) -> ReplAction<'_> {
    let input = input.trim();
    match input.to_lowercase().as_str() {
        "" => ReplAction::Skip,
        "exit" | "quit" => ReplAction::Exit,
        "clear" => ReplAction::ClearScreen,
        "reset" => ReplAction::ResetConversation,
        _ => ReplAction::Ask(input),
    }
}

fn print_banner(agent: &Agent) {
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                      Desk Agent                                  ║");
    println!("║  Type 'help' for commands, 'exit' to quit, 'reset' to forget     ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!("{} commands available. Anything else is sent to the model.", agent.registry().count());
    println!();
}

pub struct Repl {
    agent: Arc<Agent>,
}

impl Repl {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        print_banner(&self.agent);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("You: ");
            io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                println!();
                break;
            };

            match classify(&line) {
                ReplAction::Skip => continue,
                ReplAction::Exit => {
                    println!("👋 Goodbye!");
                    break;
                }
                ReplAction::ClearScreen => {
                    print!("\x1B[2J\x1B[1;1H");
                }
                ReplAction::ResetConversation => {
                    self.agent.clear_history();
                    println!("🔄 Conversation reset\n");
                }
                ReplAction::Ask(input) => {
                    if self.agent.routes_to_model(input) {
                        println!("🤔 Thinking...");
                    }
                    let reply = self.agent.handle(input).await;
                    println!("\nAgent:\n{}\n", reply.text);
                }
            }
        }

        info!("REPL finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("   "), ReplAction::Skip);
        assert_eq!(classify("EXIT"), ReplAction::Exit);
        assert_eq!(classify("quit\n"), ReplAction::Exit);
        assert_eq!(classify("clear"), ReplAction::ClearScreen);
        assert_eq!(classify("reset"), ReplAction::ResetConversation);
        assert_eq!(classify("  help ping "), ReplAction::Ask("help ping"));
    }
}
