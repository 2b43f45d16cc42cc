use anyhow::{Context, Result};
use tracing::info;

use super::{RepositoryWriter, qualify_repository};
use crate::runner::{CommandRunner, ProcessRunner};

/// Verification-only writer used for `--dry-run`.
///
/// Instead of setting the secret it runs `gh repo view` to prove the target
/// exists and is accessible. The secret value is ignored.
pub struct DryRunWriter<R = ProcessRunner> {
    runner: R,
    program: String,
    owner: Option<String>,
}

impl<R: CommandRunner> DryRunWriter<R> {
    pub fn new(runner: R, program: impl Into<String>, owner: Option<String>) -> Self {
        Self {
            runner,
            program: program.into(),
            owner,
        }
    }
}

#[async_trait::async_trait]
impl<R: CommandRunner> RepositoryWriter for DryRunWriter<R> {
    async fn write(&self, name: &str, _value: &str, repository: &str) -> Result<()> {
        let target = qualify_repository(self.owner.as_deref(), repository);
        info!(repository = %target, secret = name, "DRY RUN: would set secret");

        self.runner
            .run(&self.program, &["repo", "view", target.as_str()], None)
            .await
            .with_context(|| format!("repository {target} does not seem to exist"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::mock::MockRunner;

    #[tokio::test]
    async fn test_dry_run_views_repository() {
        let writer = DryRunWriter::new(MockRunner::succeeding("Repository exists"), "gh", None);

        writer.write("TEST_KEY", "test-secret", "test-repo").await.unwrap();

        let calls = writer.runner.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, ["repo", "view", "test-repo"]);
        assert_eq!(calls[0].stdin, None);
    }

    #[tokio::test]
    async fn test_dry_run_missing_repository() {
        let writer = DryRunWriter::new(MockRunner::failing("repository not found"), "gh", None);

        let err = writer.write("TEST_KEY", "test-secret", "test-repo").await.unwrap_err();

        assert!(err.to_string().contains("repository test-repo does not seem to exist"));
    }

    #[tokio::test]
    async fn test_dry_run_qualifies_with_owner() {
        let writer = DryRunWriter::new(MockRunner::succeeding(""), "gh", Some("octo".into()));

        writer.write("K", "v", "api").await.unwrap();

        assert_eq!(writer.runner.invocations()[0].args, ["repo", "view", "octo/api"]);
    }
}
