//! Password-based file scrambling and overwrite-before-delete.

use super::args::arg;
use super::{Category, Command, CommandContext, CommandRegistry, CommandSpec};
use crate::interfaces::CommandError;
use async_trait::async_trait;
use desk_agent_core::display;
use desk_agent_tools::os_capabilities::security;
use std::sync::Arc;
use tracing::info;

pub fn register(registry: &mut CommandRegistry) {
    registry
        .register(Arc::new(EncryptFile))
        .register(Arc::new(DecryptFile))
        .register(Arc::new(SecureDelete));
}

pub struct EncryptFile;

#[async_trait]
impl Command for EncryptFile {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "encrypt_file",
            Category::Security,
            2,
            "encrypt_file <path> <password>",
            "Write a password-scrambled copy to <path>.encrypted",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let result = security::encrypt_file(&ctx.guard, arg(args, 0), arg(args, 1)).await?;
        Ok(format!(
            "🔒 Encrypted {} → {} ({})",
            result.source.display(),
            result.output.display(),
            display::kilobytes(result.size)
        ))
    }
}

pub struct DecryptFile;

#[async_trait]
impl Command for DecryptFile {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "decrypt_file",
            Category::Security,
            2,
            "decrypt_file <path> <password>",
            "Restore a file written by encrypt_file",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let result = security::decrypt_file(&ctx.guard, arg(args, 0), arg(args, 1)).await?;
        Ok(format!(
            "🔓 Decrypted {} → {} ({})",
            result.source.display(),
            result.output.display(),
            display::kilobytes(result.size)
        ))
    }
}

pub struct SecureDelete;

#[async_trait]
impl Command for SecureDelete {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new(
            "secure_delete",
            Category::Security,
            1,
            "secure_delete <path>",
            "Overwrite a file with random data, then delete it",
        )
    }

    async fn run(&self, ctx: &CommandContext, args: &[String]) -> Result<String, CommandError> {
        let result = security::secure_delete(&ctx.guard, arg(args, 0)).await?;
        info!("Securely deleted {}", result.path.display());
        ctx.remember_context(
            "file_operation",
            &format!("Securely deleted: {}", result.path.display()),
            7,
        );
        Ok(format!(
            "🗑️ Securely deleted {} ({}, {} passes)",
            result.path.display(),
            display::kilobytes(result.size),
            result.passes
        ))
    }
}
