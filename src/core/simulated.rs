//! Simulated features for input without per-keystroke timing.
//!
//! Given only a block of text, assume a fixed typing rate, pick a typing
//! regime from the resulting speed, and sample plausible dwell, flight,
//! pause and error values for that regime.

use crate::core::features::{round_to, FeatureVector};
use crate::error::{PipelineError, Result};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use std::ops::Range;

/// Assumed characters typed per second.
const SYNTHETIC_CHARS_PER_SEC: f64 = 6.0;

/// Shortest synthetic duration in seconds.
const MIN_DURATION_SECS: f64 = 1.0;

/// Speeds at or above this are the fast regime.
const FAST_SPEED: f64 = 5.0;

/// Speeds at or below this are the slow regime.
const SLOW_SPEED: f64 = 2.5;

/// Aggregate statistics of a text block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStats {
    pub char_count: usize,
    /// Whitespace-delimited tokens, for diagnostics only
    pub word_count: usize,
    pub duration_secs: f64,
    /// Characters per second, rounded to 2 decimals
    pub speed: f64,
}

impl TextStats {
    pub fn from_text(text: &str) -> Self {
        let char_count = text.chars().count();
        let word_count = text.split_whitespace().count();
        let duration_secs = (char_count as f64 / SYNTHETIC_CHARS_PER_SEC).max(MIN_DURATION_SECS);
        let speed = round_to(char_count as f64 / duration_secs, 2);

        Self {
            char_count,
            word_count,
            duration_secs,
            speed,
        }
    }
}

/// Typing regime selected from synthetic speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Fast,
    Medium,
    Slow,
}

impl Regime {
    pub fn from_speed(speed: f64) -> Self {
        if speed >= FAST_SPEED {
            Regime::Fast
        } else if speed <= SLOW_SPEED {
            Regime::Slow
        } else {
            Regime::Medium
        }
    }

    /// Sampling policy of this regime.
    pub fn policy(&self) -> RegimePolicy {
        match self {
            Regime::Fast => RegimePolicy {
                dwell: (0.14, 0.01),
                flight: (0.12, 0.01),
                pauses: 0..2,
                errors: 0..2,
            },
            Regime::Slow => RegimePolicy {
                dwell: (0.26, 0.02),
                flight: (0.22, 0.01),
                pauses: 3..5,
                errors: 2..4,
            },
            Regime::Medium => RegimePolicy {
                dwell: (0.20, 0.015),
                flight: (0.18, 0.015),
                pauses: 1..3,
                errors: 1..3,
            },
        }
    }
}

/// Distribution parameters for one regime.
#[derive(Debug, Clone, PartialEq)]
pub struct RegimePolicy {
    /// Mean and standard deviation of average dwell
    pub dwell: (f64, f64),
    /// Mean and standard deviation of average flight
    pub flight: (f64, f64),
    /// Half-open range of pause counts
    pub pauses: Range<u32>,
    /// Half-open range of error counts
    pub errors: Range<u32>,
}

/// Feature source that simulates timing from text statistics.
pub struct SimulatedSource<R = StdRng> {
    rng: R,
}

impl SimulatedSource<StdRng> {
    /// Reproducible source for a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> SimulatedSource<R> {
    /// Use the given random source.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Simulate features for `text`, labelled with `label`.
    ///
    /// Empty or whitespace-only text is rejected before sampling.
    pub fn simulate(&mut self, text: &str, label: &str) -> Result<FeatureVector> {
        if text.trim().is_empty() {
            return Err(PipelineError::Input(
                "text is empty; type something before analyzing".to_string(),
            ));
        }

        let stats = TextStats::from_text(text);
        let regime = Regime::from_speed(stats.speed);
        let policy = regime.policy();
        tracing::debug!(
            "Simulating {:?} regime for {} chars, {} words",
            regime,
            stats.char_count,
            stats.word_count
        );

        let avg_dwell = self.sample_normal(policy.dwell)?;
        let avg_flight = self.sample_normal(policy.flight)?;
        let pauses = self.rng.gen_range(policy.pauses);
        let errors = self.rng.gen_range(policy.errors);

        Ok(FeatureVector {
            avg_dwell,
            avg_flight,
            speed: stats.speed,
            pauses,
            errors,
            label: label.to_string(),
        })
    }

    fn sample_normal(&mut self, (mean, std_dev): (f64, f64)) -> Result<f64> {
        let normal = Normal::new(mean, std_dev)
            .map_err(|e| PipelineError::Input(format!("invalid sampling policy: {e}")))?;
        Ok(round_to(normal.sample(&mut self.rng).max(0.0), 3))
    }
}
