pub mod config;
pub mod plan;
pub mod split;
pub mod validate;

use std::path::Path;

use serde::de::DeserializeOwned;
use zoneplan_core::{ConfigError, PlannerConfig};

/// The config at `path`, or the user configuration.
pub fn load_config(path: Option<&Path>) -> Result<PlannerConfig, ConfigError> {
    match path {
        Some(path) => PlannerConfig::load_from(path),
        None => Ok(PlannerConfig::load_or_default()),
    }
}

/// Parse a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let value = serde_json::from_str(&content)
        .map_err(|e| format!("invalid JSON in {}: {e}", path.display()))?;
    Ok(value)
}
