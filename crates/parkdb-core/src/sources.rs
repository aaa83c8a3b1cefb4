use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Providers this build knows how to import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Bahn,
    Neckarsulm,
}

impl SourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Bahn => "bahn",
            SourceKind::Neckarsulm => "neckarsulm",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bahn" => Ok(SourceKind::Bahn),
            "neckarsulm" => Ok(SourceKind::Neckarsulm),
            other => Err(ConfigError::Validation(format!("unknown source '{other}'"))),
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: SourceKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// File path or URL of the export. For API sources, overrides the base URL.
    pub location: Option<String>,
    /// Only lots whose address contains `", {prefix}"` get live data.
    pub postal_code_prefix: Option<String>,
    /// Per-source request timeout, overriding the global scraper timeout.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceConfig>,
}

impl SourcesFile {
    /// Enabled sources in file order.
    pub fn enabled(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

/// Load and validate the sources configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_sources(&content)
}

/// Parse and validate sources configuration from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_sources(content: &str) -> Result<SourcesFile, ConfigError> {
    let sources_file: SourcesFile =
        serde_yaml::from_str(content).map_err(ConfigError::SourcesFileParse)?;

    validate_sources(&sources_file)?;

    Ok(sources_file)
}

fn validate_sources(sources_file: &SourcesFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for source in &sources_file.sources {
        if !seen.insert(source.id) {
            return Err(ConfigError::Validation(format!(
                "duplicate source: '{}'",
                source.id
            )));
        }

        if source.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(format!(
                "source '{}' has timeout_secs 0; must be at least 1",
                source.id
            )));
        }

        let location_missing = source
            .location
            .as_deref()
            .is_none_or(|l| l.trim().is_empty());
        if source.id == SourceKind::Neckarsulm && source.enabled && location_missing {
            return Err(ConfigError::Validation(format!(
                "source '{}' requires a location (file path or URL)",
                source.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "sources_test.rs"]
mod tests;
