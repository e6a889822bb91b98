//! Typed configuration consumed by the media core
//!
//! Every section deserializes with defaults so a partial TOML file (or none
//! at all) yields a complete configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Complete configuration for probing, slicing, alignment and composition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub probe: ProbeSettings,
    pub slicer: SlicerSettings,
    pub alignment: AlignmentSettings,
    pub composition: CompositionSettings,
    pub tools: ToolSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub timeout_secs: u64,
    pub cache_capacity: usize,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            cache_capacity: 512,
        }
    }
}

impl ProbeSettings {
    /// Inspection deadline, never below one second
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicerSettings {
    /// Concurrent trim processes; `None` means half the available cores
    pub max_concurrency: Option<usize>,
    pub work_dir: PathBuf,
}

impl Default for SlicerSettings {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            work_dir: std::env::temp_dir().join("phrasecut"),
        }
    }
}

impl SlicerSettings {
    /// Effective concurrency limit, at least one
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency
            .unwrap_or_else(|| num_cpus::get() / 2)
            .max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentSettings {
    pub threshold: f64,
    pub search_margin_secs: f64,
    pub buffer_start_secs: f64,
    pub buffer_end_secs: f64,
}

impl Default for AlignmentSettings {
    fn default() -> Self {
        Self {
            threshold: 0.85,
            search_margin_secs: 10.0,
            buffer_start_secs: 0.2,
            buffer_end_secs: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionSettings {
    pub audio_gain: f64,
    pub target_frame_rate: u32,
    /// Inspect every joined artifact and require exactly one audio stream
    pub verify_audio: bool,
}

impl Default for CompositionSettings {
    fn default() -> Self {
        Self {
            audio_gain: 1.25,
            target_frame_rate: 25,
            verify_audio: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub root: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("artifacts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl CoreConfig {
    /// Check value ranges; clamped settings (timeout, concurrency) are not errors
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.probe.cache_capacity == 0 {
            return Err(DomainError::Config(
                "probe.cache_capacity must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.alignment.threshold) {
            return Err(DomainError::Config(format!(
                "alignment.threshold must be within 0.0..=1.0, got {}",
                self.alignment.threshold
            )));
        }
        for (name, value) in [
            ("alignment.search_margin_secs", self.alignment.search_margin_secs),
            ("alignment.buffer_start_secs", self.alignment.buffer_start_secs),
            ("alignment.buffer_end_secs", self.alignment.buffer_end_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DomainError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if !self.composition.audio_gain.is_finite() || self.composition.audio_gain <= 0.0 {
            return Err(DomainError::Config(format!(
                "composition.audio_gain must be positive, got {}",
                self.composition.audio_gain
            )));
        }
        if self.composition.target_frame_rate == 0 {
            return Err(DomainError::Config(
                "composition.target_frame_rate must be positive".to_string(),
            ));
        }
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(DomainError::Config(format!(
                "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = CoreConfig::default();
        assert_eq!(config.probe.timeout_secs, 30);
        assert_eq!(config.probe.cache_capacity, 512);
        assert_eq!(config.alignment.threshold, 0.85);
        assert_eq!(config.alignment.search_margin_secs, 10.0);
        assert_eq!(config.alignment.buffer_start_secs, 0.2);
        assert_eq!(config.alignment.buffer_end_secs, 0.2);
        assert_eq!(config.composition.audio_gain, 1.25);
        assert_eq!(config.composition.target_frame_rate, 25);
        assert!(config.slicer.effective_concurrency() >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_clamped_to_one_second() {
        let settings = ProbeSettings {
            timeout_secs: 0,
            cache_capacity: 1,
        };
        assert_eq!(settings.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_concurrency_clamped_to_one() {
        let settings = SlicerSettings {
            max_concurrency: Some(0),
            ..SlicerSettings::default()
        };
        assert_eq!(settings.effective_concurrency(), 1);
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut config = CoreConfig::default();
        config.alignment.threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = CoreConfig::default();
        config.composition.audio_gain = 0.0;
        assert!(config.validate().is_err());

        let mut config = CoreConfig::default();
        config.probe.cache_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = CoreConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CoreConfig = toml::from_str(
            r#"
            [probe]
            timeout_secs = 5

            [alignment]
            threshold = 0.9
            "#,
        )
        .unwrap();
        assert_eq!(config.probe.timeout_secs, 5);
        assert_eq!(config.probe.cache_capacity, 512);
        assert_eq!(config.alignment.threshold, 0.9);
        assert_eq!(config.alignment.buffer_end_secs, 0.2);
    }
}
