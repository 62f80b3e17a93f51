//! Core functionality.
//!
//! This module contains:
//! - Session state tracking and session persistence
//! - Feature extraction from completed sessions
//! - Simulated features for text without timing
//! - The feature source strategy that selects between the two

pub mod features;
pub mod session;
pub mod simulated;
pub mod source;

// Re-export commonly used types
pub use features::{
    extract_features, extract_features_with, DwellPairing, ExtractorConfig, FeatureRecord,
    FeatureVector, PAUSE_THRESHOLD_SECS,
};
pub use session::{run_listener, ListenerExit, Session, SessionState, Signal, SESSION_COLUMNS};
pub use simulated::{Regime, SimulatedSource, TextStats};
pub use source::{build_source, CaptureSource, FeatureSource, SourceInput};
