//! Classifier adapter.
//!
//! The classifier is an opaque capability mapping a label-free feature record
//! to a high/low cognitive load decision. The crate ships one concrete
//! adapter, a linear model read from a JSON file; training it is out of scope.

use crate::core::features::{FeatureRecord, FeatureVector};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Binary cognitive load decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadClass {
    Low = 0,
    High = 1,
}

impl LoadClass {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(LoadClass::Low),
            1 => Some(LoadClass::High),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Label written to the feature summary.
    pub fn label(&self) -> &'static str {
        match self {
            LoadClass::Low => "low",
            LoadClass::High => "high",
        }
    }
}

impl fmt::Display for LoadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps a feature record to a load class.
///
/// Implementations must be deterministic. Failures are reported as
/// `PipelineError::Capability` and never retried.
pub trait Classifier {
    fn classify(&self, record: &FeatureRecord) -> Result<LoadClass>;
}

/// Per-feature weights of a linear model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeights {
    pub avg_dwell: f64,
    pub avg_flight: f64,
    pub speed: f64,
    pub pauses: f64,
    pub errors: f64,
}

/// Linear decision function: `High` when the score exceeds the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: FeatureWeights,
    #[serde(default)]
    pub bias: f64,
    #[serde(default)]
    pub threshold: f64,
}

impl LinearModel {
    /// Load a model from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Capability(format!("cannot read model {path:?}: {e}")))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PipelineError::Capability(format!("invalid model: {e}")))
    }

    /// Raw decision score for a record.
    pub fn score(&self, record: &FeatureRecord) -> f64 {
        let w = &self.weights;
        self.bias
            + w.avg_dwell * record.avg_dwell
            + w.avg_flight * record.avg_flight
            + w.speed * record.speed
            + w.pauses * f64::from(record.pauses)
            + w.errors * f64::from(record.errors)
    }
}

impl Classifier for LinearModel {
    fn classify(&self, record: &FeatureRecord) -> Result<LoadClass> {
        let score = self.score(record);
        if !score.is_finite() {
            return Err(PipelineError::Capability(format!(
                "model produced a non-finite score ({score})"
            )));
        }
        Ok(if score > self.threshold {
            LoadClass::High
        } else {
            LoadClass::Low
        })
    }
}

/// Speeds below this (chars/sec) are reported as slow typing.
const SLOW_TYPING_SPEED: f64 = 3.0;

/// A human-readable hint about a feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Observation {
    SlowTyping,
    FrequentPauses,
    ManyCorrections,
}

impl Observation {
    pub fn message(&self) -> &'static str {
        match self {
            Observation::SlowTyping => {
                "Typing speed is low, possibly indicating high cognitive load."
            }
            Observation::FrequentPauses => {
                "Multiple pauses detected, which might suggest distraction or fatigue."
            }
            Observation::ManyCorrections => {
                "Several corrections were made, maybe typing under pressure."
            }
        }
    }
}

/// Hints worth surfacing for a feature vector.
pub fn observations(features: &FeatureVector) -> Vec<Observation> {
    let mut found = Vec::new();
    if features.speed < SLOW_TYPING_SPEED {
        found.push(Observation::SlowTyping);
    }
    if features.pauses > 2 {
        found.push(Observation::FrequentPauses);
    }
    if features.errors > 1 {
        found.push(Observation::ManyCorrections);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> LinearModel {
        LinearModel::from_json(
            r#"{
                "weights": {"avg_dwell": 5.0, "avg_flight": 5.0, "speed": -0.5,
                            "pauses": 0.5, "errors": 0.5},
                "bias": -1.0
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_linear_model_decisions() {
        let fast = FeatureRecord {
            avg_dwell: 0.14,
            avg_flight: 0.12,
            speed: 6.0,
            pauses: 0,
            errors: 0,
        };
        let slow = FeatureRecord {
            avg_dwell: 0.26,
            avg_flight: 0.22,
            speed: 2.0,
            pauses: 4,
            errors: 3,
        };

        let model = model();
        assert_eq!(model.classify(&fast).unwrap(), LoadClass::Low);
        assert_eq!(model.classify(&slow).unwrap(), LoadClass::High);
        // Deterministic for identical input
        assert_eq!(model.classify(&slow).unwrap(), model.classify(&slow).unwrap());
    }

    #[test]
    fn test_non_finite_score_is_capability_error() {
        let record = FeatureRecord {
            speed: f64::NAN,
            ..FeatureRecord::default()
        };
        assert!(matches!(
            model().classify(&record),
            Err(PipelineError::Capability(_))
        ));
    }

    #[test]
    fn test_invalid_model_json() {
        assert!(matches!(
            LinearModel::from_json("{\"bias\": 1.0}"),
            Err(PipelineError::Capability(_))
        ));
        assert!(matches!(
            LinearModel::load(Path::new("/nonexistent/model.json")),
            Err(PipelineError::Capability(_))
        ));
    }

    #[test]
    fn test_load_class_codes() {
        assert_eq!(LoadClass::from_u8(1), Some(LoadClass::High));
        assert_eq!(LoadClass::from_u8(2), None);
        assert_eq!(LoadClass::Low.as_u8(), 0);
        assert_eq!(LoadClass::High.to_string(), "high");
    }

    #[test]
    fn test_observations() {
        let calm = FeatureVector {
            speed: 5.5,
            pauses: 1,
            errors: 1,
            ..FeatureVector::empty("low")
        };
        assert!(observations(&calm).is_empty());

        let strained = FeatureVector {
            speed: 2.0,
            pauses: 3,
            errors: 2,
            ..FeatureVector::empty("high")
        };
        assert_eq!(
            observations(&strained),
            vec![
                Observation::SlowTyping,
                Observation::FrequentPauses,
                Observation::ManyCorrections
            ]
        );
    }
}
