//! Human-facing output: the configuration dump and the end-of-run summary.

use std::collections::BTreeMap;

use anyhow::Result;
use tracing::{error, info};

use crate::config::Configuration;
use crate::distribute::DistributionOutcome;

const MASK: &str = "****";

/// How vault references appear in a configuration dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceDisplay {
    /// Keep the scheme (`op://`) and hide the rest.
    #[default]
    Masked,
    /// Print references verbatim.
    Show,
}

/// Hides everything after the scheme of a vault reference.
pub fn mask_reference(reference: &str) -> String {
    match reference.split_once("://") {
        Some((scheme, _)) => format!("{scheme}://{MASK}"),
        None => MASK.to_string(),
    }
}

/// Renders every repository's merged configuration as YAML.
pub fn render_dump(configuration: &Configuration, display: ReferenceDisplay) -> Result<String> {
    let dump: BTreeMap<&str, BTreeMap<String, String>> = configuration
        .merged()
        .map(|(repository, merged)| {
            let entries = merged
                .into_iter()
                .map(|(name, reference)| match display {
                    ReferenceDisplay::Masked => (name, mask_reference(&reference)),
                    ReferenceDisplay::Show => (name, reference),
                })
                .collect();
            (repository, entries)
        })
        .collect();

    if dump.is_empty() {
        return Ok("# no repositories configured\n".to_string());
    }
    Ok(serde_yaml::to_string(&dump)?)
}

/// Logs the aggregated result of a run, one line per failure.
pub fn log_summary(outcome: &DistributionOutcome) {
    for failure in outcome.failures() {
        error!(
            repository = %failure.repository,
            secret = %failure.secret,
            reference = %failure.reference,
            kind = %failure.kind,
            error = %failure.message,
            "Secret not applied"
        );
    }
    for repo in outcome.failed_repositories() {
        if let Some(reason) = &repo.aborted {
            error!(repository = %repo.repository, reason = %reason, "Repository aborted");
        }
    }

    let secrets: usize = outcome.repositories.iter().map(|r| r.secrets).sum();
    let elapsed_ms = (outcome.finished_at - outcome.started_at).num_milliseconds();
    info!(
        repositories = outcome.repositories.len(),
        failed_repositories = outcome.failed_repositories().count(),
        secrets,
        failed_secrets = outcome.failures().count(),
        elapsed_ms,
        success = outcome.succeeded(),
        "Distribution finished"
    );
}

/// Logs the outcome as pretty-printed JSON.
pub fn print_json(outcome: &DistributionOutcome) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}
