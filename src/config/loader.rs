use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use super::{Configuration, RepositoryConfiguration};
use crate::error::ConfigParseError;

/// Where the configuration is read from when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

/// On-disk shape. A section may be left empty (`repo:`), which YAML reads as null.
type RawSections = BTreeMap<String, Option<RepositoryConfiguration>>;

impl Configuration {
    /// Loads the configuration file at `path`.
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigParseError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigParseError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let origin = path.display().to_string();

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        debug!(path = %origin, is_json, bytes = content.len(), "Parsing configuration");

        if is_json {
            parse_json(&content, &origin)
        } else {
            parse_yaml(&content, &origin)
        }
    }

    /// Parses a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigParseError> {
        parse_yaml(content, "<inline>")
    }

    /// Parses a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigParseError> {
        parse_json(content, "<inline>")
    }
}

fn parse_yaml(content: &str, origin: &str) -> Result<Configuration, ConfigParseError> {
    let raw: RawSections =
        serde_yaml::from_str(content).map_err(|source| ConfigParseError::Yaml {
            origin: origin.to_string(),
            source,
        })?;
    Ok(into_configuration(raw))
}

fn parse_json(content: &str, origin: &str) -> Result<Configuration, ConfigParseError> {
    let raw: RawSections =
        serde_json::from_str(content).map_err(|source| ConfigParseError::Json {
            origin: origin.to_string(),
            source,
        })?;
    Ok(into_configuration(raw))
}

fn into_configuration(raw: RawSections) -> Configuration {
    Configuration::from_sections(
        raw.into_iter()
            .map(|(name, section)| (name, section.unwrap_or_default()))
            .collect(),
    )
}
