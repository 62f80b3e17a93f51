//! Feature computation from key event sessions.
//!
//! Turns a completed session log into the five-dimensional feature vector
//! (average dwell, average flight, typing speed, pause count, error count)
//! plus the session's cognitive load label.

use crate::collector::types::KeyEvent;
use crate::core::session::Session;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;

/// Flight times strictly above this many seconds count as pauses.
pub const PAUSE_THRESHOLD_SECS: f64 = 0.5;

/// The label-free part of a feature vector; what the classifier sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Average key hold duration in seconds
    pub avg_dwell: f64,
    /// Average release-to-press gap in seconds
    pub avg_flight: f64,
    /// Printable characters per second
    pub speed: f64,
    /// Number of flight times above the pause threshold
    pub pauses: u32,
    /// Number of backspace presses
    pub errors: u32,
}

/// Features of one session together with its label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub avg_dwell: f64,
    pub avg_flight: f64,
    pub speed: f64,
    pub pauses: u32,
    pub errors: u32,
    pub label: String,
}

impl FeatureVector {
    /// All-zero features carrying only a label.
    pub fn empty(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn from_record(record: FeatureRecord, label: impl Into<String>) -> Self {
        Self {
            avg_dwell: record.avg_dwell,
            avg_flight: record.avg_flight,
            speed: record.speed,
            pauses: record.pauses,
            errors: record.errors,
            label: label.into(),
        }
    }

    /// Strip the label for classification.
    pub fn record(&self) -> FeatureRecord {
        FeatureRecord {
            avg_dwell: self.avg_dwell,
            avg_flight: self.avg_flight,
            speed: self.speed,
            pauses: self.pauses,
            errors: self.errors,
        }
    }
}

/// How presses are matched with releases to measure dwell time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DwellPairing {
    /// The i-th press pairs with the i-th release; pairs whose keys differ
    /// are dropped. Mis-pairs whenever key holds overlap.
    Positional,
    /// Each release pairs with the most recent unmatched press of the same
    /// key. Correct under overlapping holds.
    #[default]
    PerKey,
}

/// Tunables for feature extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractorConfig {
    pub pairing: DwellPairing,
    pub pause_threshold_secs: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            pairing: DwellPairing::default(),
            pause_threshold_secs: PAUSE_THRESHOLD_SECS,
        }
    }
}

/// Compute features for a session with default settings.
pub fn extract_features(session: &Session) -> FeatureVector {
    extract_features_with(session, &ExtractorConfig::default())
}

/// Compute features for a session.
///
/// Never fails: an empty session yields an all-zero vector with its label.
pub fn extract_features_with(session: &Session, config: &ExtractorConfig) -> FeatureVector {
    let events = session.events();
    if events.is_empty() {
        return FeatureVector::empty(session.label());
    }

    let presses: Vec<&KeyEvent> = events.iter().filter(|e| e.is_press()).collect();

    let dwell_times = match config.pairing {
        DwellPairing::Positional => positional_dwell_times(events),
        DwellPairing::PerKey => per_key_dwell_times(events),
    };
    let avg_dwell = mean_or_zero(&dwell_times);

    let flight_times: Vec<f64> = presses.iter().filter_map(|e| e.flight_time).collect();
    let avg_flight = mean_or_zero(&flight_times);

    // Timestamps are non-decreasing in capture order, but persisted sessions
    // may not honor that, so take the true extremes.
    let (first, last) = events
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| {
            (lo.min(e.timestamp), hi.max(e.timestamp))
        });
    let total_time = last - first;
    let total_chars = presses.iter().filter(|e| e.key.is_printable()).count();
    let speed = if total_time > 0.0 {
        total_chars as f64 / total_time
    } else {
        0.0
    };

    let pauses = flight_times
        .iter()
        .filter(|&&f| f > config.pause_threshold_secs)
        .count() as u32;
    let errors = presses.iter().filter(|e| e.key.is_backspace()).count() as u32;

    FeatureVector {
        avg_dwell: round_to(avg_dwell.max(0.0), 3),
        avg_flight: round_to(avg_flight.max(0.0), 3),
        speed: round_to(speed, 2),
        pauses,
        errors,
        label: session.label().to_string(),
    }
}

/// Pair the i-th press with the i-th release.
fn positional_dwell_times(events: &[KeyEvent]) -> Vec<f64> {
    let presses = events.iter().filter(|e| e.is_press());
    let releases = events.iter().filter(|e| e.is_release());

    presses
        .zip(releases)
        .filter(|(press, release)| press.key == release.key)
        .map(|(press, release)| release.timestamp - press.timestamp)
        .collect()
}

/// Pair each release with the latest unmatched press of the same key.
fn per_key_dwell_times(events: &[KeyEvent]) -> Vec<f64> {
    let mut pending: HashMap<&str, Vec<f64>> = HashMap::new();
    let mut dwell_times = Vec::new();

    for event in events {
        if event.is_press() {
            pending
                .entry(event.key.as_str())
                .or_default()
                .push(event.timestamp);
        } else if let Some(pressed) = pending
            .get_mut(event.key.as_str())
            .and_then(|stack| stack.pop())
        {
            dwell_times.push(event.timestamp - pressed);
        }
    }

    dwell_times
}

fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.mean()
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
