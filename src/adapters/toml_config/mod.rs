// TOML config adapter - Loads CoreConfig from a TOML file

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::config::CoreConfig;
use crate::domain::errors::*;

/// Default file names, checked in order when no path is given
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["phrasecut.toml", "config/phrasecut.toml"];

/// Resolves and parses the configuration file
pub struct TomlConfigLoader {
    search_paths: Vec<PathBuf>,
}

impl Default for TomlConfigLoader {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from).collect())
    }
}

impl TomlConfigLoader {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Load from `explicit`, else the first existing search path, else defaults.
    ///
    /// Returns the configuration and the file it came from, if any. An explicit
    /// path that does not exist is an error.
    pub fn load(&self, explicit: Option<&Path>) -> Result<(CoreConfig, Option<PathBuf>), DomainError> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(DomainError::Config(format!(
                        "Config file does not exist: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => self.search_paths.iter().find(|p| p.is_file()).cloned(),
        };

        match path {
            Some(path) => {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    DomainError::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                let config = Self::parse(&content).map_err(|e| match e {
                    DomainError::Config(reason) => {
                        DomainError::Config(format!("{}: {}", path.display(), reason))
                    }
                    other => other,
                })?;
                debug!("Loaded configuration from {}", path.display());
                Ok((config, Some(path)))
            }
            None => {
                debug!("No configuration file found, using defaults");
                Ok((CoreConfig::default(), None))
            }
        }
    }

    /// Parse TOML content; missing sections and keys take their defaults
    pub fn parse(content: &str) -> Result<CoreConfig, DomainError> {
        toml::from_str(content)
            .map_err(|e| DomainError::Config(format!("Failed to parse TOML config: {}", e)))
    }

    /// Render a configuration as TOML
    pub fn render(config: &CoreConfig) -> Result<String, DomainError> {
        toml::to_string_pretty(config)
            .map_err(|e| DomainError::Config(format!("Failed to serialize config: {}", e)))
    }
}
