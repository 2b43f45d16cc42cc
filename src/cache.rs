//! Per-run memoization of vault reads.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::CachedError;
use crate::vault::VaultReader;

type CacheEntry = Result<String, CachedError>;

/// Remembers the outcome of every vault reference resolved during one
/// distribution run.
///
/// The first outcome for a reference, success or failure, is final and is
/// handed back verbatim on every later request. The check, the fetch and
/// the insert happen under a single lock, so concurrent repositories never
/// read the same reference twice.
#[derive(Default)]
pub struct SecretCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl SecretCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached outcome for `reference`, fetching it through
    /// `reader` on first use.
    pub async fn resolve(
        &self,
        reference: &str,
        reader: &dyn VaultReader,
    ) -> Result<String, CachedError> {
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get(reference) {
            debug!(reference, failed = entry.is_err(), "Secret cache hit");
            return entry.clone();
        }

        let entry = reader.fetch(reference).await.map_err(CachedError::from);
        entries.insert(reference.to_string(), entry.clone());
        entry
    }

    /// Number of distinct references resolved so far.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
