//! Repository secret stores.
//!
//! [`RepositoryWriter`] applies one named secret to one repository.
//! [`GhSecretWriter`] does it with `gh secret set`; [`DryRunWriter`] only
//! checks that the repository is reachable with `gh repo view`.

mod dry_run;
mod gh;

pub use dry_run::DryRunWriter;
pub use gh::GhSecretWriter;

use std::sync::Arc;

use anyhow::Result;

use crate::runner::CommandRunner;

/// Applies a `(name, value)` secret to a repository.
#[async_trait::async_trait]
pub trait RepositoryWriter: Send + Sync {
    async fn write(&self, name: &str, value: &str, repository: &str) -> Result<()>;
}

/// Picks the live or the verification-only writer.
pub fn select_writer<R>(
    dry_run: bool,
    runner: R,
    program: impl Into<String>,
    owner: Option<String>,
) -> Arc<dyn RepositoryWriter>
where
    R: CommandRunner + 'static,
{
    if dry_run {
        Arc::new(DryRunWriter::new(runner, program, owner))
    } else {
        Arc::new(GhSecretWriter::new(runner, program, owner))
    }
}

/// Prefixes `owner/` onto bare repository names. Names that already
/// contain a slash are returned as is.
pub fn qualify_repository(owner: Option<&str>, repository: &str) -> String {
    match owner {
        Some(owner) if !owner.is_empty() && !repository.contains('/') => {
            format!("{owner}/{repository}")
        }
        _ => repository.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::mock::MockRunner;

    #[test]
    fn test_qualify_bare_name() {
        assert_eq!(qualify_repository(Some("octo"), "api"), "octo/api");
    }

    #[test]
    fn test_qualify_keeps_full_name() {
        assert_eq!(qualify_repository(Some("octo"), "other/api"), "other/api");
    }

    #[test]
    fn test_qualify_without_owner() {
        assert_eq!(qualify_repository(None, "api"), "api");
        assert_eq!(qualify_repository(Some(""), "api"), "api");
    }

    #[tokio::test]
    async fn test_select_dry_run_writer() {
        let writer = select_writer(true, MockRunner::failing("not found"), "gh", None);
        let err = writer.write("KEY", "value", "octo/api").await.unwrap_err();
        assert!(err.to_string().contains("does not seem to exist"));
    }

    #[tokio::test]
    async fn test_select_live_writer() {
        let writer = select_writer(false, MockRunner::failing("HTTP 404"), "gh", None);
        let err = writer.write("KEY", "value", "octo/api").await.unwrap_err();
        assert!(err.to_string().contains("failed adding secret KEY"));
        assert!(format!("{err:#}").contains("HTTP 404"));
    }
}
