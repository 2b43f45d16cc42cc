//! Secret distribution configuration.
//!
//! The configuration is a two-level mapping: section name → (secret name →
//! vault reference). The reserved [`COMMON_SECTION`] applies to every
//! repository; every other section names a repository.
//!
//! ```yaml
//! common:
//!   SONAR_TOKEN: op://ci/sonar/token
//! octo/api:
//!   DEPLOY_KEY: op://ci/api/deploy-key
//! ```

mod loader;

pub use loader::DEFAULT_CONFIG_PATH;

use std::collections::BTreeMap;

/// Section whose entries are shared by all repositories.
pub const COMMON_SECTION: &str = "common";

/// Secret name → vault reference for a single repository.
///
/// Ordered so that secrets are processed and logged in a stable order.
pub type RepositoryConfiguration = BTreeMap<String, String>;

/// The parsed configuration for a whole distribution run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    raw: BTreeMap<String, RepositoryConfiguration>,
    repositories: Vec<String>,
}

impl Configuration {
    /// Builds a configuration from already-parsed sections.
    pub fn from_sections(raw: BTreeMap<String, RepositoryConfiguration>) -> Self {
        let repositories = derive_repository_list(&raw);
        Self { raw, repositories }
    }

    /// Repository names in ascending order, never including `common`.
    pub fn repositories(&self) -> &[String] {
        &self.repositories
    }

    /// Shared entries, empty when the section is absent.
    pub fn common(&self) -> Option<&RepositoryConfiguration> {
        self.raw.get(COMMON_SECTION)
    }

    /// Returns the common entries overridden by the entries of `repository`.
    ///
    /// A repository without its own section simply receives the common entries.
    pub fn merge_for_repository(&self, repository: &str) -> RepositoryConfiguration {
        let mut merged = self.common().cloned().unwrap_or_default();
        if let Some(specific) = self.raw.get(repository) {
            merged.extend(specific.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged
    }

    /// Iterates over `(repository, merged configuration)` in repository order.
    pub fn merged(&self) -> impl Iterator<Item = (&str, RepositoryConfiguration)> + '_ {
        self.repositories
            .iter()
            .map(|repo| (repo.as_str(), self.merge_for_repository(repo)))
    }

    /// Number of distinct vault references across all sections.
    pub fn distinct_references(&self) -> usize {
        let mut refs: Vec<&str> = self
            .raw
            .values()
            .flat_map(|section| section.values().map(String::as_str))
            .collect();
        refs.sort_unstable();
        refs.dedup();
        refs.len()
    }
}

/// Every top-level key except `common`, sorted ascending.
pub fn derive_repository_list(raw: &BTreeMap<String, RepositoryConfiguration>) -> Vec<String> {
    let mut repositories: Vec<String> = raw
        .keys()
        .filter(|key| key.as_str() != COMMON_SECTION)
        .cloned()
        .collect();
    // BTreeMap keys are already ordered; keep the sort explicit in case the
    // backing map ever changes.
    repositories.sort();
    repositories
}
