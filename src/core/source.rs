//! Interchangeable feature producers.
//!
//! Captured sessions and simulated text both end in a `FeatureVector`. The
//! producer is picked from configuration so the rest of the pipeline never
//! knows which one it is talking to.

use crate::config::{Config, SourceMode};
use crate::core::features::{extract_features_with, ExtractorConfig, FeatureVector};
use crate::core::session::Session;
use crate::core::simulated::SimulatedSource;
use crate::error::{PipelineError, Result};
use rand::Rng;

/// Input handed to a feature source.
#[derive(Debug, Clone)]
pub enum SourceInput {
    /// A completed key event session
    Session(Session),
    /// Free text without timing, with the label to attach
    Text { text: String, label: String },
}

impl SourceInput {
    pub fn text(text: impl Into<String>, label: impl Into<String>) -> Self {
        SourceInput::Text {
            text: text.into(),
            label: label.into(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            SourceInput::Session(_) => "session",
            SourceInput::Text { .. } => "text",
        }
    }
}

/// Anything that turns input into a feature vector.
pub trait FeatureSource {
    /// Short name for logs and status output.
    fn name(&self) -> &'static str;

    /// Produce the feature vector for `input`.
    fn produce(&mut self, input: &SourceInput) -> Result<FeatureVector>;
}

/// Source backed by real per-keystroke timing.
#[derive(Debug, Clone, Default)]
pub struct CaptureSource {
    config: ExtractorConfig,
}

impl CaptureSource {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }
}

impl FeatureSource for CaptureSource {
    fn name(&self) -> &'static str {
        "capture"
    }

    fn produce(&mut self, input: &SourceInput) -> Result<FeatureVector> {
        match input {
            SourceInput::Session(session) => Ok(extract_features_with(session, &self.config)),
            other => Err(wrong_input(self.name(), other)),
        }
    }
}

impl<R: Rng> FeatureSource for SimulatedSource<R> {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn produce(&mut self, input: &SourceInput) -> Result<FeatureVector> {
        match input {
            SourceInput::Text { text, label } => self.simulate(text, label),
            other => Err(wrong_input(self.name(), other)),
        }
    }
}

fn wrong_input(source: &str, input: &SourceInput) -> PipelineError {
    PipelineError::Input(format!(
        "the {source} source cannot process {} input",
        input.kind()
    ))
}

/// Build the source selected by `config`.
pub fn build_source(config: &Config) -> Box<dyn FeatureSource> {
    match config.source {
        SourceMode::Capture => Box::new(CaptureSource::new(config.extractor())),
        SourceMode::Simulated => match config.seed {
            Some(seed) => Box::new(SimulatedSource::seeded(seed)),
            None => Box::new(SimulatedSource::from_entropy()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_source_follows_config() {
        let mut config = Config::default();
        assert_eq!(build_source(&config).name(), "capture");

        config.source = SourceMode::Simulated;
        config.seed = Some(5);
        assert_eq!(build_source(&config).name(), "simulated");
    }

    #[test]
    fn test_seeded_config_is_deterministic() {
        let config = Config {
            source: SourceMode::Simulated,
            seed: Some(99),
            ..Config::default()
        };
        let input = SourceInput::text("typing under pressure", "low");

        let a = build_source(&config).produce(&input).unwrap();
        let b = build_source(&config).produce(&input).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_input_kind_rejected() {
        let mut capture = CaptureSource::default();
        assert!(matches!(
            capture.produce(&SourceInput::text("abc", "low")),
            Err(PipelineError::Input(_))
        ));

        let mut simulated = SimulatedSource::seeded(1);
        let session = Session::from_events("low", Vec::new());
        assert!(matches!(
            simulated.produce(&SourceInput::Session(session)),
            Err(PipelineError::Input(_))
        ));
    }

    #[test]
    fn test_capture_source_keeps_session_label() {
        let mut capture = CaptureSource::default();
        let session = Session::from_events("high", Vec::new());
        let features = capture.produce(&SourceInput::Session(session)).unwrap();
        assert_eq!(features.label, "high");
    }
}
