//! Typing Load Agent - cognitive load detection from keystroke timing.
//!
//! This library turns a stream of key press/release events into a compact
//! behavioral feature vector (dwell, flight, speed, pauses, errors), classifies
//! it as high or low cognitive load, and appends it to a durable feature log.
//! When no per-keystroke timing is available, a simulated source derives a
//! plausible vector from a block of typed text instead.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Typing Load Agent                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐             │
//! │  │  Collector  │──▶│   Session   │──▶│  Features   │──┐          │
//! │  │ (key stream)│   │   Tracker   │   │  (extract)  │  │          │
//! │  └─────────────┘   └─────────────┘   └─────────────┘  │          │
//! │                                      ┌─────────────┐  │          │
//! │                    text ────────────▶│  Simulated  │──┤          │
//! │                                      └─────────────┘  ▼          │
//! │                    ┌─────────────┐   ┌─────────────┐             │
//! │                    │   Feature   │◀──│ Classifier  │             │
//! │                    │    Store    │   │  (linear)   │             │
//! │                    └─────────────┘   └─────────────┘             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use typing_load_agent::collector::Key;
//! use typing_load_agent::core::{extract_features, SessionState};
//!
//! let mut state = SessionState::new("low");
//! state.on_press(Key::from_raw("a"), 0.0);
//! state.on_release(Key::from_raw("a"), 0.1);
//! state.on_press(Key::from_raw("b"), 0.3);
//! state.on_release(Key::from_raw("b"), 0.35);
//!
//! let features = extract_features(&state.finish());
//! assert_eq!(features.avg_dwell, 0.075);
//! assert_eq!(features.speed, 5.71);
//! ```

pub mod classifier;
pub mod collector;
pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod stats;
pub mod store;

// Re-export key types at crate root for convenience
pub use classifier::{Classifier, LinearModel, LoadClass, Observation};
pub use collector::{Collector, CollectorConfig, CollectorError, Key, KeyEvent, RawKeyEvent};
pub use config::{Config, SourceMode};
pub use core::{
    extract_features, FeatureSource, FeatureVector, Session, SessionState, SimulatedSource,
    SourceInput,
};
pub use error::{PipelineError, Result};
pub use pipeline::{Outcome, Pipeline};
pub use stats::CollectionStats;
pub use store::FeatureStore;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Data collection notice that can be displayed to users.
pub const DATA_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║            TYPING LOAD AGENT - DATA COLLECTION NOTICE            ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This agent records typing behavior for cognitive load research. ║
║                                                                  ║
║  ✓ WHAT A RECORDED SESSION CONTAINS:                             ║
║    • Which key was pressed or released, and when                 ║
║    • The gap between releasing one key and pressing the next     ║
║    • The cognitive load label you assign to the session          ║
║                                                                  ║
║  ✓ WHAT THE FEATURE SUMMARY CONTAINS:                            ║
║    • Average hold and gap times, typing speed                    ║
║    • Pause and correction counts, and the session label          ║
║                                                                  ║
║  ✗ WHAT IS NEVER DONE:                                           ║
║    • No data leaves this machine                                 ║
║    • Text analyzed with `analyze` is not stored, only features   ║
║                                                                  ║
║  Session files contain your keystrokes. Do not record while      ║
║  typing passwords or other secrets.                              ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
