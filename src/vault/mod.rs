//! Secret vault access.
//!
//! [`VaultReader`] resolves a vault reference into its plaintext value.
//! [`OnePasswordReader`] implements it with the 1Password CLI (`op read`).

mod onepassword;

pub use onepassword::OnePasswordReader;

use anyhow::Result;

/// Resolves a vault reference (e.g. `op://vault/item/field`) into a plaintext secret.
#[async_trait::async_trait]
pub trait VaultReader: Send + Sync {
    async fn fetch(&self, reference: &str) -> Result<String>;
}
