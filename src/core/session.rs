//! Session state tracking.
//!
//! A `SessionState` is owned by the caller and fed one event at a time by the
//! listener loop. It attaches flight time to every press and decides when the
//! session ends. Once finished it becomes an immutable `Session`, which can be
//! persisted to and reloaded from the session CSV format.

use crate::collector::types::{EventType, Key, KeyEvent, RawKeyEvent, STOP_KEY};
use crate::error::{PipelineError, Result};
use crate::store::rows::{decode_row, encode_row, parse_number, read_record, Header};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Column names of the persisted session format, in write order.
pub const SESSION_COLUMNS: [&str; 5] = ["key", "event", "timestamp", "flight_time", "cognitive_load"];

/// What the listener should do after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Continue,
    Stop,
}

/// Mutable capture state for one session.
#[derive(Debug)]
pub struct SessionState {
    id: Uuid,
    label: String,
    stop_key: Key,
    last_release_time: Option<f64>,
    last_timestamp: Option<f64>,
    log: Vec<KeyEvent>,
}

impl SessionState {
    /// Start a session with the default stop key.
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_stop_key(label, Key::from_raw(STOP_KEY))
    }

    /// Start a session that ends when `stop_key` is released.
    pub fn with_stop_key(label: impl Into<String>, stop_key: Key) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            stop_key,
            last_release_time: None,
            last_timestamp: None,
            log: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn event_count(&self) -> usize {
        self.log.len()
    }

    pub fn last_release_time(&self) -> Option<f64> {
        self.last_release_time
    }

    /// Handle a key press.
    pub fn on_press(&mut self, key: Key, now: f64) {
        let now = self.monotonic(now);
        let flight_time = self.last_release_time.map(|released| now - released);

        self.log.push(KeyEvent {
            key,
            event: EventType::Press,
            timestamp: now,
            flight_time,
            cognitive_load: self.label.clone(),
        });
    }

    /// Handle a key release. Returns `Signal::Stop` for the stop key.
    pub fn on_release(&mut self, key: Key, now: f64) -> Signal {
        let now = self.monotonic(now);
        self.last_release_time = Some(now);

        let signal = if key == self.stop_key {
            Signal::Stop
        } else {
            Signal::Continue
        };

        self.log.push(KeyEvent {
            key,
            event: EventType::Release,
            timestamp: now,
            flight_time: None,
            cognitive_load: self.label.clone(),
        });

        signal
    }

    /// Dispatch a raw event from the capture adapter.
    ///
    /// Events without a timestamp are placed at the previous event's time.
    pub fn handle(&mut self, raw: RawKeyEvent) -> Signal {
        let key = Key::from_raw(&raw.key);
        let now = raw.timestamp.or(self.last_timestamp).unwrap_or(0.0);
        match raw.event {
            EventType::Press => {
                self.on_press(key, now);
                Signal::Continue
            }
            EventType::Release => self.on_release(key, now),
        }
    }

    /// Close the session and hand the log over for extraction.
    pub fn finish(self) -> Session {
        Session {
            id: self.id,
            label: self.label,
            events: self.log,
        }
    }

    // Capture order defines time order; a clock that steps back is clamped.
    fn monotonic(&mut self, now: f64) -> f64 {
        let now = match self.last_timestamp {
            Some(last) if now < last => {
                tracing::warn!(
                    "Key event at {:.6} precedes previous event at {:.6}; clamping",
                    now,
                    last
                );
                last
            }
            _ => now,
        };
        self.last_timestamp = Some(now);
        now
    }
}

/// A completed, immutable key event session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: Uuid,
    label: String,
    events: Vec<KeyEvent>,
}

impl Session {
    /// Build a session from an already ordered event log.
    pub fn from_events(label: impl Into<String>, events: Vec<KeyEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            events,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn events(&self) -> &[KeyEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Write the session in the persisted CSV format, replacing any file.
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
        writeln!(out, "{}", encode_row(&SESSION_COLUMNS))?;
        for event in &self.events {
            let timestamp = event.timestamp.to_string();
            let flight = event.flight_time.map(|f| f.to_string()).unwrap_or_default();
            let row: [&str; 5] = [
                event.key.as_str(),
                event.event.as_str(),
                &timestamp,
                &flight,
                &event.cognitive_load,
            ];
            writeln!(out, "{}", encode_row(&row))?;
        }
        out.flush()?;

        tracing::info!("Saved {} key events to {:?}", self.events.len(), path);
        Ok(())
    }

    /// Load a session from the persisted CSV format.
    ///
    /// Any read failure or malformed content surfaces as a parse error.
    pub fn load_csv(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| PipelineError::Parse(format!("cannot read session {path:?}: {e}")))?;
        let mut reader = BufReader::new(file);
        let mut next_record = || {
            read_record(&mut reader).map_err(|e| match e {
                PipelineError::Io(e) => {
                    PipelineError::Parse(format!("cannot read session {path:?}: {e}"))
                }
                other => other,
            })
        };

        let header_line = next_record()?
            .ok_or_else(|| PipelineError::Parse(format!("session {path:?} is empty")))?;
        let header = Header::parse(&header_line, &SESSION_COLUMNS)?;

        let mut events = Vec::new();
        while let Some(line) = next_record()? {
            if line.trim().is_empty() {
                continue;
            }
            let row = decode_row(&line)?;

            let event: EventType = header
                .field(&row, "event")?
                .parse()
                .map_err(PipelineError::Parse)?;
            let flight = header.field(&row, "flight_time")?;
            let flight_time = if flight.trim().is_empty() {
                None
            } else {
                Some(parse_number(flight, "flight_time")?)
            };

            events.push(KeyEvent {
                key: Key::from_raw(header.field(&row, "key")?),
                event,
                timestamp: parse_number(header.field(&row, "timestamp")?, "timestamp")?,
                flight_time,
                cognitive_load: header.field(&row, "cognitive_load")?.to_string(),
            });
        }

        let label = events
            .first()
            .map(|e| e.cognitive_load.clone())
            .unwrap_or_default();
        Ok(Self::from_events(label, events))
    }
}

/// Why the listener loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerExit {
    /// The stop key was released
    StopKey,
    /// The running flag was cleared (e.g. Ctrl+C)
    Interrupted,
    /// The event stream ended
    Disconnected,
}

/// Block on `receiver`, feeding every event to `state` until the session ends.
pub fn run_listener(
    receiver: &Receiver<RawKeyEvent>,
    state: &mut SessionState,
    running: &AtomicBool,
) -> ListenerExit {
    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(raw) => {
                tracing::trace!("{} {}", raw.event.as_str(), raw.key);
                if state.handle(raw) == Signal::Stop {
                    return ListenerExit::StopKey;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return ListenerExit::Disconnected,
        }
    }
    ListenerExit::Interrupted
}
