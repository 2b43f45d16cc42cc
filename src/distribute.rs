//! The distribution engine.
//!
//! A run is a two-level fold: for every repository, resolve every configured
//! secret through the [`SecretCache`] and write it with the
//! [`RepositoryWriter`]. Failures are logged, recorded and folded into the
//! result; they never stop the remaining secrets or repositories.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::cache::SecretCache;
use crate::config::{Configuration, RepositoryConfiguration};
use crate::error::{FailureKind, SecretFailure};
use crate::repo::RepositoryWriter;
use crate::vault::VaultReader;

/// Result of applying one repository's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryOutcome {
    pub repository: String,
    /// Number of secrets that were configured for the repository.
    pub secrets: usize,
    pub failures: Vec<SecretFailure>,
    /// Set when the repository task died before finishing.
    pub aborted: Option<String>,
}

impl RepositoryOutcome {
    fn new(repository: &str, secrets: usize) -> Self {
        Self {
            repository: repository.to_string(),
            secrets,
            failures: Vec::new(),
            aborted: None,
        }
    }

    fn record(&mut self, secret: &str, reference: &str, kind: FailureKind, message: String) {
        self.failures.push(SecretFailure {
            repository: self.repository.clone(),
            secret: secret.to_string(),
            reference: reference.to_string(),
            kind,
            message,
        });
    }

    fn aborted(repository: String, secrets: usize, reason: String) -> Self {
        Self {
            repository,
            secrets,
            failures: Vec::new(),
            aborted: Some(reason),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failures.is_empty() && self.aborted.is_none()
    }
}

/// Result of a whole distribution run.
#[derive(Debug, Clone, Serialize)]
pub struct DistributionOutcome {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub repositories: Vec<RepositoryOutcome>,
}

impl DistributionOutcome {
    /// `true` iff every repository succeeded. An empty run succeeds.
    pub fn succeeded(&self) -> bool {
        self.repositories.iter().all(RepositoryOutcome::succeeded)
    }

    pub fn failed_repositories(&self) -> impl Iterator<Item = &RepositoryOutcome> {
        self.repositories.iter().filter(|r| !r.succeeded())
    }

    pub fn failures(&self) -> impl Iterator<Item = &SecretFailure> {
        self.repositories.iter().flat_map(|r| r.failures.iter())
    }
}

/// Applies `repo_config` to `repository`, returning `true` only if every
/// secret was both resolved and written.
pub async fn apply_to_repository(
    repo_config: &RepositoryConfiguration,
    repository: &str,
    reader: &dyn VaultReader,
    writer: &dyn RepositoryWriter,
    cache: &SecretCache,
) -> bool {
    process_repository(repo_config, repository, reader, writer, cache)
        .await
        .succeeded()
}

/// Applies the merged configuration of every repository, one after the
/// other. Returns `true` iff all of them succeeded.
pub async fn distribute(
    configuration: &Configuration,
    reader: &dyn VaultReader,
    writer: &dyn RepositoryWriter,
    cache: &SecretCache,
) -> bool {
    process_sequentially(configuration, reader, writer, cache)
        .await
        .iter()
        .all(RepositoryOutcome::succeeded)
}

/// Processes every repository in order; no outcome stops the next one.
async fn process_sequentially(
    configuration: &Configuration,
    reader: &dyn VaultReader,
    writer: &dyn RepositoryWriter,
    cache: &SecretCache,
) -> Vec<RepositoryOutcome> {
    let mut outcomes = Vec::with_capacity(configuration.repositories().len());
    for (repository, repo_config) in configuration.merged() {
        outcomes.push(process_repository(&repo_config, repository, reader, writer, cache).await);
    }
    outcomes
}

#[tracing::instrument(
    name = "apply_repository",
    skip_all,
    fields(repository = %repository, secrets = repo_config.len())
)]
async fn process_repository(
    repo_config: &RepositoryConfiguration,
    repository: &str,
    reader: &dyn VaultReader,
    writer: &dyn RepositoryWriter,
    cache: &SecretCache,
) -> RepositoryOutcome {
    if repo_config.is_empty() {
        info!("No secrets configured, skipping");
    }

    let mut outcome = RepositoryOutcome::new(repository, repo_config.len());

    for (name, reference) in repo_config {
        let value = match cache.resolve(reference, reader).await {
            Ok(value) => value,
            Err(e) => {
                error!(secret = %name, reference = %reference, error = %e, "Error reading secret");
                outcome.record(name, reference, FailureKind::Resolution, e.to_string());
                continue;
            }
        };

        match writer.write(name, &value, repository).await {
            Ok(()) => debug!(secret = %name, "Secret applied"),
            Err(e) => {
                let message = format!("{e:#}");
                error!(secret = %name, reference = %reference, error = %message, "Error writing secret");
                outcome.record(name, reference, FailureKind::Write, message);
            }
        }
    }

    if outcome.failures.is_empty() {
        info!("Repository done");
    } else {
        warn!(failed = outcome.failures.len(), "Cannot apply config to repository successfully");
    }

    outcome
}

/// Runs distributions with injected collaborators.
///
/// Repositories are processed `concurrency` at a time (default 1, i.e.
/// strictly sequential). Secrets within a repository are always written in
/// order. All repositories share one [`SecretCache`].
pub struct Distributor {
    reader: Arc<dyn VaultReader>,
    writer: Arc<dyn RepositoryWriter>,
    cache: Arc<SecretCache>,
    concurrency: usize,
}

impl Distributor {
    pub fn new(reader: Arc<dyn VaultReader>, writer: Arc<dyn RepositoryWriter>) -> Self {
        Self {
            reader,
            writer,
            cache: Arc::new(SecretCache::new()),
            concurrency: 1,
        }
    }

    /// Replaces the run's cache, e.g. to inspect it afterwards.
    pub fn with_cache(mut self, cache: Arc<SecretCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Maximum number of repositories processed at once. Values below 1 are
    /// treated as 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn cache(&self) -> &SecretCache {
        &self.cache
    }

    /// Shorthand for `run(..).succeeded()`.
    pub async fn distribute(&self, configuration: &Configuration) -> bool {
        self.run(configuration).await.succeeded()
    }

    /// Processes every repository and reports per-repository outcomes in
    /// repository order.
    pub async fn run(&self, configuration: &Configuration) -> DistributionOutcome {
        let started_at = Utc::now();
        info!(
            repositories = configuration.repositories().len(),
            concurrency = self.concurrency,
            "Starting secret distribution"
        );

        let repositories = if self.concurrency <= 1 {
            process_sequentially(
                configuration,
                self.reader.as_ref(),
                self.writer.as_ref(),
                &self.cache,
            )
            .await
        } else {
            self.run_parallel(configuration).await
        };

        DistributionOutcome {
            started_at,
            finished_at: Utc::now(),
            repositories,
        }
    }

    async fn run_parallel(&self, configuration: &Configuration) -> Vec<RepositoryOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = Vec::with_capacity(configuration.repositories().len());

        for (repository, repo_config) in configuration.merged() {
            let sem = semaphore.clone();
            let reader = self.reader.clone();
            let writer = self.writer.clone();
            let cache = self.cache.clone();
            let name = repository.to_string();
            let secrets = repo_config.len();

            let task = tokio::spawn(async move {
                // The semaphore is never closed, so acquiring cannot fail.
                let _permit = sem.acquire().await.ok();
                process_repository(&repo_config, &name, reader.as_ref(), writer.as_ref(), &cache)
                    .await
            });
            tasks.push((repository.to_string(), secrets, task));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (repository, secrets, task) in tasks {
            match task.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(repository = %repository, error = %e, "Repository task aborted");
                    outcomes.push(RepositoryOutcome::aborted(repository, secrets, e.to_string()));
                }
            }
        }
        outcomes
    }
}
