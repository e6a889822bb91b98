//! Configuration initialization and hierarchy management
//!
//! Precedence, lowest first: defaults, TOML file, `PHRASECUT_*` environment
//! variables, command-line flags.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info};

use crate::adapters::TomlConfigLoader;
use crate::domain::config::CoreConfig;
use crate::error::{PhraseCutError, PhraseCutResult};

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "PHRASECUT_";

/// Overrides taken from global command-line flags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    pub json_logs: bool,
    pub max_concurrency: Option<usize>,
    pub storage_root: Option<PathBuf>,
}

/// Load, override and validate the configuration
pub fn initialize_configuration(
    config_path: Option<&Path>,
    overrides: &CliOverrides,
) -> PhraseCutResult<CoreConfig> {
    let (mut config, source) = TomlConfigLoader::default().load(config_path)?;
    if let Some(source) = source {
        info!("Loaded configuration from: {}", source.display());
    }

    let applied = apply_environment_overrides(
        &mut config,
        std::env::vars().filter(|(key, _)| key.starts_with(ENV_PREFIX)),
    )?;
    if applied > 0 {
        info!("Applied {} environment variable overrides", applied);
    }

    apply_cli_overrides(&mut config, overrides);
    config.validate()?;
    Ok(config)
}

/// Apply `PHRASECUT_*` variables; unknown names are ignored
pub fn apply_environment_overrides<I>(config: &mut CoreConfig, vars: I) -> PhraseCutResult<usize>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut applied = 0;
    for (key, value) in vars {
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let known = match name {
            "LOG_LEVEL" => {
                config.logging.level = value.clone();
                true
            }
            "JSON_LOGS" => {
                config.logging.json = parse_value(&key, &value)?;
                true
            }
            "PROBE_TIMEOUT_SECS" => {
                config.probe.timeout_secs = parse_value(&key, &value)?;
                true
            }
            "CACHE_CAPACITY" => {
                config.probe.cache_capacity = parse_value(&key, &value)?;
                true
            }
            "MAX_CONCURRENCY" => {
                config.slicer.max_concurrency = Some(parse_value(&key, &value)?);
                true
            }
            "WORK_DIR" => {
                config.slicer.work_dir = PathBuf::from(&value);
                true
            }
            "ALIGNMENT_THRESHOLD" => {
                config.alignment.threshold = parse_value(&key, &value)?;
                true
            }
            "AUDIO_GAIN" => {
                config.composition.audio_gain = parse_value(&key, &value)?;
                true
            }
            "VERIFY_AUDIO" => {
                config.composition.verify_audio = parse_value(&key, &value)?;
                true
            }
            "FFMPEG" => {
                config.tools.ffmpeg = PathBuf::from(&value);
                true
            }
            "FFPROBE" => {
                config.tools.ffprobe = PathBuf::from(&value);
                true
            }
            "STORAGE_ROOT" => {
                config.storage.root = PathBuf::from(&value);
                true
            }
            _ => false,
        };
        if known {
            debug!("Environment override: {} = {}", key, value);
            applied += 1;
        }
    }
    Ok(applied)
}

/// Apply command-line flags over everything else
pub fn apply_cli_overrides(config: &mut CoreConfig, overrides: &CliOverrides) {
    if let Some(level) = &overrides.log_level {
        config.logging.level = level.clone();
    }
    if overrides.json_logs {
        config.logging.json = true;
    }
    if let Some(limit) = overrides.max_concurrency {
        config.slicer.max_concurrency = Some(limit);
    }
    if let Some(root) = &overrides.storage_root {
        config.storage.root = root.clone();
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> PhraseCutResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| PhraseCutError::InvalidOverride {
            key: key.to_string(),
            value: value.to_string(),
        })
}
