//! Configuration file parsing (HOCON or YAML).

use std::path::Path;

use hocon::HoconLoader;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Hocon,
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from the file extension; anything not YAML is HOCON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                ConfigFormat::Yaml
            }
            _ => ConfigFormat::Hocon,
        }
    }
}

/// Load configuration from a file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    match ConfigFormat::from_path(path) {
        ConfigFormat::Yaml => {
            let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
                path: path.display().to_string(),
                source: e,
            })?;
            load_config_str(&content, ConfigFormat::Yaml)
        }
        ConfigFormat::Hocon => HoconLoader::new()
            .load_file(path)
            .map_err(|e| ConfigError::IoError {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            })?
            .resolve()
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            }),
    }
}

/// Load configuration from a string in the given format.
pub fn load_config_str(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        }),
        ConfigFormat::Hocon => HoconLoader::new()
            .load_str(content)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })?
            .resolve()
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            }),
    }
}
