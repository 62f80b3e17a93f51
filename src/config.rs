//! Configuration for the typing load agent.

use crate::collector::types::STOP_KEY;
use crate::core::features::{DwellPairing, ExtractorConfig, PAUSE_THRESHOLD_SECS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const APP_DIR: &str = "typing-load-agent";

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for sessions, the feature summary and statistics
    pub data_path: PathBuf,

    /// File name of the feature summary inside `data_path`
    pub summary_file: String,

    /// Which feature source produces vectors
    pub source: SourceMode,

    /// Seed for the simulated source; entropy when unset
    pub seed: Option<u64>,

    /// Key whose release ends a capture session
    pub stop_key: String,

    /// Flight times above this many seconds count as pauses
    pub pause_threshold_secs: f64,

    /// How presses are paired with releases for dwell time
    pub dwell_pairing: DwellPairing,

    /// Linear model file used for classification
    pub model_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            data_path: data_dir,
            summary_file: "features_summary.csv".to_string(),
            source: SourceMode::default(),
            seed: None,
            stop_key: STOP_KEY.to_string(),
            pause_threshold_secs: PAUSE_THRESHOLD_SECS,
            dwell_pairing: DwellPairing::default(),
            model_path: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    /// Path of the append-only feature summary.
    pub fn summary_path(&self) -> PathBuf {
        self.data_path.join(&self.summary_file)
    }

    /// Directory holding persisted sessions.
    pub fn sessions_dir(&self) -> PathBuf {
        self.data_path.join("sessions")
    }

    /// Path of the persisted collection statistics.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("stats.json")
    }

    /// Extraction settings derived from this configuration.
    pub fn extractor(&self) -> ExtractorConfig {
        ExtractorConfig {
            pairing: self.dwell_pairing,
            pause_threshold_secs: self.pause_threshold_secs,
        }
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(self.sessions_dir())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Which producer turns input into feature vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Real per-keystroke timing from a captured session
    #[default]
    Capture,
    /// Timing simulated from text statistics
    Simulated,
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_mode_names() {
        let config: Config = serde_json::from_str(r#"{"source": "simulated"}"#).unwrap();
        assert_eq!(config.source, SourceMode::Simulated);
        assert!(serde_json::from_str::<Config>(r#"{"source": "random"}"#).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source, SourceMode::Capture);
        assert_eq!(config.stop_key, "escape");
        assert_eq!(config.pause_threshold_secs, 0.5);
        assert_eq!(config.dwell_pairing, DwellPairing::PerKey);
        assert!(config.summary_path().ends_with("features_summary.csv"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"source": "simulated", "seed": 9, "dwell_pairing": "positional"}"#)
                .unwrap();
        assert_eq!(config.source, SourceMode::Simulated);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.dwell_pairing, DwellPairing::Positional);
        assert_eq!(config.summary_file, "features_summary.csv");
    }
}
