use anyhow::{Context, Result};

use super::VaultReader;
use crate::runner::{CommandRunner, ProcessRunner};

/// Reads secrets through the 1Password CLI.
///
/// The process must already be signed in (`op signin`, a service account
/// token in `OP_SERVICE_ACCOUNT_TOKEN`, or the desktop app integration).
pub struct OnePasswordReader<R = ProcessRunner> {
    runner: R,
    program: String,
}

impl<R: CommandRunner> OnePasswordReader<R> {
    /// Uses `program` (normally `op`) as the CLI executable.
    pub fn new(runner: R, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }
}

#[async_trait::async_trait]
impl<R: CommandRunner> VaultReader for OnePasswordReader<R> {
    /// Runs `op read <reference>` and returns stdout with surrounding
    /// whitespace removed.
    async fn fetch(&self, reference: &str) -> Result<String> {
        let out = self
            .runner
            .run(&self.program, &["read", reference], None)
            .await
            .with_context(|| format!("failed to read secret '{reference}'"))?;

        let value =
            String::from_utf8(out).with_context(|| format!("secret '{reference}' is not UTF-8"))?;
        Ok(value.trim().to_string())
    }
}
