//! Key event types shared by the capture adapter, the session tracker and
//! the feature extractor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Symbolic name of the key that ends a capture session by default.
pub const STOP_KEY: &str = "escape";

/// Symbolic name of the key counted as an error correction.
pub const BACKSPACE_KEY: &str = "backspace";

/// A normalized key identity.
///
/// Either a single printable character (`"a"`, `"A"`, `","`) or a lowercase
/// symbolic name (`"escape"`, `"shift"`, `"space"`). Identities that are not
/// characters never fail to parse; they fall back to their lowercase name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Normalize a raw identity as reported by an input source.
    ///
    /// Accepts bare characters, symbolic names (`"Shift"`), and the
    /// `Key.<name>` spelling used by common listener libraries.
    pub fn from_raw(raw: &str) -> Self {
        let mut chars = raw.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Self::from_char(c);
        }

        let trimmed = raw.trim();
        let name = trimmed
            .strip_prefix("Key.")
            .or_else(|| trimmed.strip_prefix("key."))
            .unwrap_or(trimmed)
            .to_lowercase();

        let name = match name.as_str() {
            "" => "unknown",
            "esc" => STOP_KEY,
            "back_space" | "bksp" => BACKSPACE_KEY,
            "return" => "enter",
            "del" => "delete",
            other => other,
        };
        Key(name.to_string())
    }

    fn from_char(c: char) -> Self {
        let name = match c {
            ' ' => "space",
            '\u{8}' | '\u{7f}' => BACKSPACE_KEY,
            '\u{1b}' => STOP_KEY,
            '\t' => "tab",
            '\n' | '\r' => "enter",
            c if c.is_control() || c.is_whitespace() => "unknown",
            c => return Key(c.to_string()),
        };
        Key(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the identity is a single printable character.
    pub fn is_printable(&self) -> bool {
        let mut chars = self.0.chars();
        matches!(
            (chars.next(), chars.next()),
            (Some(c), None) if !c.is_control() && !c.is_whitespace()
        )
    }

    pub fn is_backspace(&self) -> bool {
        self.0 == BACKSPACE_KEY
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(raw: &str) -> Self {
        Key::from_raw(raw)
    }
}

/// Whether a key went down or came up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Press,
    Release,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Press => "press",
            EventType::Release => "release",
        }
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "press" | "down" => Ok(EventType::Press),
            "release" | "up" => Ok(EventType::Release),
            other => Err(format!("unknown event type '{other}'")),
        }
    }
}

/// A key event as delivered by the capture adapter, before the tracker
/// has attached flight time or a session label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawKeyEvent {
    pub key: String,
    pub event: EventType,
    /// Seconds since the Unix epoch. Stamped on arrival when absent.
    #[serde(default)]
    pub timestamp: Option<f64>,
}

impl RawKeyEvent {
    pub fn press(key: &str, timestamp: f64) -> Self {
        Self {
            key: key.to_string(),
            event: EventType::Press,
            timestamp: Some(timestamp),
        }
    }

    pub fn release(key: &str, timestamp: f64) -> Self {
        Self {
            key: key.to_string(),
            event: EventType::Release,
            timestamp: Some(timestamp),
        }
    }
}

/// One entry of a session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    pub event: EventType,
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    /// Time since the previous release; only ever set on presses
    pub flight_time: Option<f64>,
    /// Supervised cognitive load label of the session
    pub cognitive_load: String,
}

impl KeyEvent {
    pub fn is_press(&self) -> bool {
        self.event == EventType::Press
    }

    pub fn is_release(&self) -> bool {
        self.event == EventType::Release
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_keys_kept() {
        assert_eq!(Key::from_raw("a").as_str(), "a");
        assert_eq!(Key::from_raw("A").as_str(), "A");
        assert_eq!(Key::from_raw(",").as_str(), ",");
        assert!(Key::from_raw("é").is_printable());
    }

    #[test]
    fn test_symbolic_names_normalized() {
        assert_eq!(Key::from_raw("Key.esc").as_str(), STOP_KEY);
        assert_eq!(Key::from_raw("Escape").as_str(), STOP_KEY);
        assert_eq!(Key::from_raw("Key.backspace").as_str(), BACKSPACE_KEY);
        assert_eq!(Key::from_raw("Key.shift_r").as_str(), "shift_r");
        assert_eq!(Key::from_raw(" ").as_str(), "space");
        assert_eq!(Key::from_raw("\u{8}").as_str(), BACKSPACE_KEY);
        assert_eq!(Key::from_raw("").as_str(), "unknown");
    }

    #[test]
    fn test_printable_classification() {
        assert!(Key::from_raw("x").is_printable());
        assert!(!Key::from_raw("shift").is_printable());
        assert!(!Key::from_raw("Key.space").is_printable());
        assert!(Key::from_raw("Key.backspace").is_backspace());
    }

    #[test]
    fn test_event_type_parsing() {
        assert_eq!("press".parse::<EventType>(), Ok(EventType::Press));
        assert_eq!("Release".parse::<EventType>(), Ok(EventType::Release));
        assert!("hold".parse::<EventType>().is_err());
    }

    #[test]
    fn test_raw_event_json() {
        let raw: RawKeyEvent =
            serde_json::from_str(r#"{"key":"Key.esc","event":"release"}"#).unwrap();
        assert_eq!(raw.event, EventType::Release);
        assert!(raw.timestamp.is_none());
    }
}
