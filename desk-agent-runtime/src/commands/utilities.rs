//! Calculator, passwords, text digests and the clock.

use super::args::{self, arg};
use super::{Category, Command, CommandContext, CommandRegistry, CommandSpec};
use crate::interfaces::CommandError;
use async_trait::async_trait;
use desk_agent_tools::os_capabilities::hashing::{self, HashAlgorithm};
use desk_agent_tools::os_capabilities::utilities;
use std::sync::Arc;

pub fn register(registry: &mut CommandRegistry) {
    registry
        .register(Arc::new(Calculator))
        .register(Arc::new(GeneratePassword))
        .register(Arc::new(HashText))
        .register(Arc::new(CurrentTime));
}

pub struct Calculator;

#[async_trait]
impl Command for Calculator {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "calculator",
            Category::Utilities,
            1,
            "calculator <expression>",
            "Evaluate arithmetic: + - * / // ** and parentheses",
        )
    }

    async fn run(&self, _ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let expression = args::rest(args, 0);
        let result = utilities::calculate(&expression)?;
        Ok(format!("🧮 {} = {}", expression.trim(), result))
    }
}

pub struct GeneratePassword;

#[async_trait]
impl Command for GeneratePassword {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "generate_password",
            Category::Utilities,
            0,
            "generate_password [length=16]",
            "Generate a random password",
        )
    }

    async fn run(&self, _ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let length: usize = args::number_or(args, 0, "length", 16)?;
        if !(1..=utilities::MAX_PASSWORD_LENGTH).contains(&length) {
            return Err(CommandError::Usage(format!(
                "length must be between 1 and {}",
                utilities::MAX_PASSWORD_LENGTH
            )));
        }
        let password = utilities::generate_password(length)?;
        Ok(format!("🔑 {}", password))
    }
}

pub struct HashText;

#[async_trait]
impl Command for HashText {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "hash_text",
            Category::Utilities,
            1,
            "hash_text <text> [algorithm=sha256]",
            "Digest a piece of text",
        )
    }

    async fn run(&self, _ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let algorithm = match args.get(1) {
            Some(name) => name.parse::<HashAlgorithm>()?,
            None => HashAlgorithm::default(),
        };
        Ok(format!(
            "🔐 {}: {}",
            algorithm,
            hashing::hash_text(arg(args, 0), algorithm)
        ))
    }
}

pub struct CurrentTime;

#[async_trait]
impl Command for CurrentTime {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "current_time",
            Category::Utilities,
            0,
            "current_time",
            "Current local date and time",
        )
    }

    async fn run(&self, _ctx: &CommandContext, _args: &[String]) -> Result<String, CommandError> {
        let now = utilities::current_time();
        Ok(format!(
            "🕐 {} {} ({}, UTC{})",
            now.date, now.time, now.weekday, now.utc_offset
        ))
    }
}
