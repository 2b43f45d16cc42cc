use anyhow::{Context, Result};
use tracing::info;

use super::{RepositoryWriter, qualify_repository};
use crate::runner::{CommandRunner, ProcessRunner};

/// Sets GitHub Actions repository secrets with the GitHub CLI.
///
/// The value is handed to `gh secret set` on stdin, so it never shows up in
/// the process list.
pub struct GhSecretWriter<R = ProcessRunner> {
    runner: R,
    program: String,
    owner: Option<String>,
}

impl<R: CommandRunner> GhSecretWriter<R> {
    pub fn new(runner: R, program: impl Into<String>, owner: Option<String>) -> Self {
        Self {
            runner,
            program: program.into(),
            owner,
        }
    }
}

#[async_trait::async_trait]
impl<R: CommandRunner> RepositoryWriter for GhSecretWriter<R> {
    async fn write(&self, name: &str, value: &str, repository: &str) -> Result<()> {
        let target = qualify_repository(self.owner.as_deref(), repository);
        info!(repository = %target, secret = name, "Setting secret");

        self.runner
            .run(
                &self.program,
                &["secret", "set", name, "--repo", target.as_str()],
                Some(value),
            )
            .await
            .with_context(|| format!("failed adding secret {name} to repository {target}"))?;

        Ok(())
    }
}
