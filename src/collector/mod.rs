//! Event collection module.
//!
//! The core never owns an input device. Key events arrive as a line-oriented
//! raw event stream that a capture adapter decodes onto a channel.

pub mod stream;
pub mod types;

// Re-export commonly used types
pub use stream::{now_secs, CollectorConfig, CollectorError, StreamCollector};
pub use types::{EventType, Key, KeyEvent, RawKeyEvent, BACKSPACE_KEY, STOP_KEY};

/// Collector type used by the CLI.
pub type Collector = StreamCollector;
