//! Distributes secrets from a 1Password vault to GitHub repository secrets.
//!
//! A YAML file maps repositories to `secret name → vault reference` entries,
//! with a shared `common` section. Each reference is read once per run and
//! written to every repository that needs it.

pub mod cache;
pub mod config;
pub mod distribute;
pub mod error;
pub mod output;
pub mod repo;
pub mod runner;
pub mod vault;
