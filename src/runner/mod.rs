//! External command execution.
//!
//! Every side effect of a distribution run (reading the vault, writing or
//! checking a repository) is a single blocking CLI call. [`CommandRunner`]
//! is that capability; [`ProcessRunner`] is the production implementation.

mod process;

#[cfg(test)]
pub(crate) mod mock;

pub use process::ProcessRunner;

use anyhow::Result;
use async_trait::async_trait;

/// Runs a program to completion and returns its stdout.
///
/// `stdin`, when given, is written to the child and the pipe is closed
/// afterwards. A spawn failure, a timeout or a non-zero exit status is an
/// error.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str], stdin: Option<&str>) -> Result<Vec<u8>>;
}
