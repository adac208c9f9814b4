use crate::defaults;
use crate::error::{DiarizerError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub vad: VadConfig,
    pub clustering: ClusteringConfig,
    pub assembly: AssemblyConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Source audio ingestion limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    pub max_file_size_bytes: u64,
    pub processing_timeout_secs: u64,
}

/// Voice activity detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VadConfig {
    /// Speech/non-speech strictness, 0 (lenient) to 3 (strict).
    pub aggressiveness: u8,
    pub min_speech_duration_ms: u64,
    pub min_silence_gap_ms: u64,
}

/// Speaker clustering configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Cosine distance below which two clusters are treated as one voice.
    pub min_separation_threshold: f32,
    pub max_speakers: usize,
}

/// Result assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssemblyConfig {
    pub min_merge_gap_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::DEFAULT_HOST.to_string(),
            port: defaults::DEFAULT_PORT,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: defaults::MAX_FILE_SIZE_BYTES,
            processing_timeout_secs: defaults::PROCESSING_TIMEOUT_SECS,
        }
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            aggressiveness: defaults::VAD_AGGRESSIVENESS,
            min_speech_duration_ms: defaults::MIN_SPEECH_DURATION_MS,
            min_silence_gap_ms: defaults::MIN_SILENCE_GAP_MS,
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_separation_threshold: defaults::MIN_SEPARATION_THRESHOLD,
            max_speakers: defaults::MAX_SPEAKERS,
        }
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            min_merge_gap_ms: defaults::MIN_MERGE_GAP_MS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - DIARIZER_HOST → server.host
    /// - DIARIZER_PORT → server.port
    /// - DIARIZER_MAX_FILE_SIZE_BYTES → ingest.max_file_size_bytes
    /// - DIARIZER_PROCESSING_TIMEOUT_SECS → ingest.processing_timeout_secs
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("DIARIZER_HOST")
            && !host.is_empty()
        {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("DIARIZER_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }

        if let Ok(size) = std::env::var("DIARIZER_MAX_FILE_SIZE_BYTES")
            && let Ok(size) = size.parse()
        {
            self.ingest.max_file_size_bytes = size;
        }

        if let Ok(secs) = std::env::var("DIARIZER_PROCESSING_TIMEOUT_SECS")
            && let Ok(secs) = secs.parse()
        {
            self.ingest.processing_timeout_secs = secs;
        }

        self
    }

    /// Reject out-of-range values before the pipeline ever sees them.
    pub fn validate(&self) -> Result<()> {
        if self.vad.aggressiveness > 3 {
            return Err(DiarizerError::ConfigInvalidValue {
                key: "vad.aggressiveness".to_string(),
                message: "must be 0..=3".to_string(),
            });
        }
        if !(1..=defaults::MAX_SPEAKERS).contains(&self.clustering.max_speakers) {
            return Err(DiarizerError::ConfigInvalidValue {
                key: "clustering.max_speakers".to_string(),
                message: format!("must be 1..={}", defaults::MAX_SPEAKERS),
            });
        }
        if !self.clustering.min_separation_threshold.is_finite()
            || self.clustering.min_separation_threshold < 0.0
        {
            return Err(DiarizerError::ConfigInvalidValue {
                key: "clustering.min_separation_threshold".to_string(),
                message: "must be a non-negative finite number".to_string(),
            });
        }
        if self.ingest.max_file_size_bytes == 0 {
            return Err(DiarizerError::ConfigInvalidValue {
                key: "ingest.max_file_size_bytes".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.ingest.processing_timeout_secs == 0 {
            return Err(DiarizerError::ConfigInvalidValue {
                key: "ingest.processing_timeout_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, defaults::DEFAULT_PORT);
        assert_eq!(config.vad.aggressiveness, defaults::VAD_AGGRESSIVENESS);
        assert_eq!(config.clustering.max_speakers, 2);
    }

    #[test]
    fn parse_partial_toml_fills_defaults() {
        let toml_str = r#"
            [vad]
            aggressiveness = 3

            [clustering]
            min_separation_threshold = 0.25
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.vad.aggressiveness, 3);
        assert_eq!(config.clustering.min_separation_threshold, 0.25);
        // Untouched sections keep defaults
        assert_eq!(
            config.vad.min_speech_duration_ms,
            defaults::MIN_SPEECH_DURATION_MS
        );
        assert_eq!(
            config.ingest.max_file_size_bytes,
            defaults::MAX_FILE_SIZE_BYTES
        );
    }

    #[test]
    fn parse_empty_toml_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn validate_rejects_aggressiveness_out_of_range() {
        let mut config = Config::default();
        config.vad.aggressiveness = 4;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("vad.aggressiveness"));
    }

    #[test]
    fn validate_rejects_zero_max_speakers() {
        let mut config = Config::default();
        config.clustering.max_speakers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_max_speakers_above_cap() {
        let mut config = Config::default();
        config.clustering.max_speakers = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_separation_threshold() {
        let mut config = Config::default();
        config.clustering.min_separation_threshold = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_nan_separation_threshold() {
        let mut config = Config::default();
        config.clustering.min_separation_threshold = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.ingest.processing_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_max_file_size() {
        let mut config = Config::default();
        config.ingest.max_file_size_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config, parsed);
    }
}
