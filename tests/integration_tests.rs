use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use gh_distribute_secrets::cache::SecretCache;
use gh_distribute_secrets::config::Configuration;
use gh_distribute_secrets::distribute::{Distributor, distribute};
use gh_distribute_secrets::output::{ReferenceDisplay, render_dump};
use gh_distribute_secrets::repo::RepositoryWriter;
use gh_distribute_secrets::vault::VaultReader;

#[derive(Default)]
struct CountingVault {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl VaultReader for CountingVault {
    async fn fetch(&self, reference: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("secret for {reference}"))
    }
}

#[derive(Default)]
struct CountingRepos {
    calls: AtomicUsize,
    fail_for: Option<String>,
}

#[async_trait::async_trait]
impl RepositoryWriter for CountingRepos {
    async fn write(&self, _name: &str, _value: &str, repository: &str) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_for.as_deref() == Some(repository) {
            anyhow::bail!("cannot write to {repository}");
        }
        Ok(())
    }
}

const CONFIG: &str = "
common:
   KEY0: VAL0
repo1:
   KEY1: VAL1
repo2:
   KEY2: VAL2
";

#[tokio::test]
async fn test_full_pipeline_from_file() {
    let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    let configuration = Configuration::load(file.path()).expect("Failed to load config");

    assert_eq!(configuration.repositories(), ["repo1", "repo2"]);
    let repo1 = configuration.merge_for_repository("repo1");
    assert_eq!(repo1.len(), 2);
    assert_eq!(repo1["KEY0"], "VAL0");
    assert_eq!(repo1["KEY1"], "VAL1");

    let vault = CountingVault::default();
    let repos = CountingRepos::default();
    let cache = SecretCache::new();

    let ok = distribute(&configuration, &vault, &repos, &cache).await;

    assert!(ok);
    assert_eq!(repos.calls.load(Ordering::SeqCst), 4);
    assert_eq!(vault.calls.load(Ordering::SeqCst), 3);
    assert_eq!(cache.len().await, 3);
}

#[tokio::test]
async fn test_failing_repository_does_not_stop_the_run() {
    let configuration = Configuration::from_yaml_str(CONFIG).unwrap();
    let vault = Arc::new(CountingVault::default());
    let repos = Arc::new(CountingRepos {
        fail_for: Some("repo1".to_string()),
        ..Default::default()
    });

    let outcome = Distributor::new(vault.clone(), repos.clone())
        .run(&configuration)
        .await;

    assert!(!outcome.succeeded());
    assert!(!outcome.repositories[0].succeeded());
    assert!(outcome.repositories[1].succeeded());
    assert_eq!(repos.calls.load(Ordering::SeqCst), 4);
    assert_eq!(vault.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_parallel_run_matches_sequential_result() {
    let configuration = Configuration::from_yaml_str(CONFIG).unwrap();
    let vault = Arc::new(CountingVault::default());
    let repos = Arc::new(CountingRepos::default());

    let ok = Distributor::new(vault.clone(), repos.clone())
        .with_concurrency(8)
        .distribute(&configuration)
        .await;

    assert!(ok);
    assert_eq!(repos.calls.load(Ordering::SeqCst), 4);
    assert_eq!(vault.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_dump_config_masks_by_default() {
    let configuration =
        Configuration::from_yaml_str("common:\n  TOKEN: op://ci/token/credential\nrepo1:\n")
            .unwrap();

    let dump = render_dump(&configuration, ReferenceDisplay::default()).unwrap();

    assert!(dump.contains("repo1"));
    assert!(dump.contains("TOKEN"));
    assert!(!dump.contains("ci/token/credential"));
}
