use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{config::TempoConfig, error::DomainError};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, DomainError> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(DomainError::validation(format!(
                "unsupported config file {:?}, expected .yaml, .yml or .json",
                path
            ))),
        }
    }
}

impl TempoConfig {
    /// Parses and validates a config document. Missing keys take their defaults.
    pub fn parse(text: &str, format: ConfigFormat) -> Result<Self, DomainError> {
        let config: TempoConfig = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(text)
                .map_err(|err| DomainError::Serialization(err.to_string()))?,
            ConfigFormat::Json => serde_json::from_str(text)
                .map_err(|err| DomainError::Serialization(err.to_string()))?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let text = fs::read_to_string(path)?;
        Self::parse(&text, format)
    }

    pub fn render(&self, format: ConfigFormat) -> Result<String, DomainError> {
        match format {
            ConfigFormat::Yaml => serde_yaml::to_string(self)
                .map_err(|err| DomainError::Serialization(err.to_string())),
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|err| DomainError::Serialization(err.to_string())),
        }
    }
}
