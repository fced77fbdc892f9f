use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed reading config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed parsing config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no pvr configuration found for: {0:?}")]
    UnknownPvr(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pvr: HashMap<String, PvrConfig>,
}

/// One configured PVR instance. `kind` is the backend type tag, e.g.
/// "sonarr_v4" or "radarr_v5".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PvrConfig {
    pub url: String,
    pub api_key: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Page size for backends that paginate their wanted lists.
    #[serde(default)]
    pub page_size: Option<u64>,
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Look up a PVR by its configured name (case-sensitive, matching the
    /// config file section header).
    pub fn pvr(&self, name: &str) -> Result<&PvrConfig, ConfigError> {
        self.pvr
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPvr(name.to_string()))
    }
}
