//! Capture adapter that decodes a JSON-lines key event stream.
//!
//! Each line is one `RawKeyEvent`, e.g.
//! `{"key": "a", "event": "press", "timestamp": 1700000000.125}`.
//! A reader thread decodes lines and forwards them on a bounded channel so
//! the listener loop only ever blocks on the channel.

use crate::collector::types::RawKeyEvent;
use chrono::Utc;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Configuration for the stream collector.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Capacity of the event channel
    pub channel_capacity: usize,
    /// Skip undecodable lines instead of ending the stream
    pub skip_malformed: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 10_000,
            skip_malformed: true,
        }
    }
}

/// Errors that can occur during event collection.
#[derive(Debug)]
pub enum CollectorError {
    AlreadyRunning,
    SpawnFailed(String),
}

impl std::fmt::Display for CollectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorError::AlreadyRunning => write!(f, "Collector is already running"),
            CollectorError::SpawnFailed(e) => write!(f, "Could not spawn reader thread: {e}"),
        }
    }
}

impl std::error::Error for CollectorError {}

/// Current wall clock time in seconds since the Unix epoch.
pub fn now_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Collector that reads raw key events from any line-oriented source.
pub struct StreamCollector {
    config: CollectorConfig,
    receiver: Option<Receiver<RawKeyEvent>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StreamCollector {
    /// Create a new collector.
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            receiver: None,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Start reading events from `reader` on a background thread.
    ///
    /// The channel disconnects once the reader reaches end of input or the
    /// collector is stopped.
    pub fn start<R>(&mut self, reader: R) -> Result<(), CollectorError>
    where
        R: BufRead + Send + 'static,
    {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }

        let (sender, receiver) = bounded(self.config.channel_capacity);
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let skip_malformed = self.config.skip_malformed;
        let handle = std::thread::Builder::new()
            .name("key-stream-reader".to_string())
            .spawn(move || read_events(reader, sender, running, skip_malformed))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CollectorError::SpawnFailed(e.to_string())
            })?;

        self.receiver = Some(receiver);
        self.handle = Some(handle);
        Ok(())
    }

    /// Stop capturing events.
    ///
    /// The reader thread notices on its next line; a thread blocked on
    /// input is left to exit with the process.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.handle = None;
    }

    /// Check if the collector is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the receiver for key events, if started.
    pub fn receiver(&self) -> Option<&Receiver<RawKeyEvent>> {
        self.receiver.as_ref()
    }
}

fn read_events<R: BufRead>(
    reader: R,
    sender: Sender<RawKeyEvent>,
    running: Arc<AtomicBool>,
    skip_malformed: bool,
) {
    for (index, line) in reader.lines().enumerate() {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Key stream read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let mut event: RawKeyEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) if skip_malformed => {
                tracing::warn!("Skipping malformed key event on line {}: {}", index + 1, e);
                continue;
            }
            Err(e) => {
                tracing::warn!("Malformed key event on line {}: {}", index + 1, e);
                break;
            }
        };
        if event.timestamp.is_none() {
            event.timestamp = Some(now_secs());
        }

        if sender.send(event).is_err() {
            // Listener is gone
            break;
        }
    }

    running.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::EventType;
    use std::io::Cursor;
    use std::time::Duration;

    fn collect_all(input: &str, config: CollectorConfig) -> Vec<RawKeyEvent> {
        let mut collector = StreamCollector::new(config);
        collector.start(Cursor::new(input.to_string())).unwrap();
        let receiver = collector.receiver().unwrap().clone();

        let mut events = Vec::new();
        while let Ok(event) = receiver.recv_timeout(Duration::from_secs(2)) {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_stream_decoding() {
        let input = "{\"key\":\"a\",\"event\":\"press\",\"timestamp\":1.0}\n\
                     \n\
                     {\"key\":\"a\",\"event\":\"release\",\"timestamp\":1.1}\n";
        let events = collect_all(input, CollectorConfig::default());

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, EventType::Press);
        assert_eq!(events[1].timestamp, Some(1.1));
    }

    #[test]
    fn test_missing_timestamp_is_stamped() {
        let events = collect_all(
            "{\"key\":\"a\",\"event\":\"press\"}\n",
            CollectorConfig::default(),
        );
        assert_eq!(events.len(), 1);
        assert!(events[0].timestamp.unwrap() > 0.0);
    }

    #[test]
    fn test_malformed_lines() {
        let input = "not json\n{\"key\":\"b\",\"event\":\"press\",\"timestamp\":2.0}\n";

        let skipped = collect_all(input, CollectorConfig::default());
        assert_eq!(skipped.len(), 1);

        let strict = collect_all(
            input,
            CollectorConfig {
                skip_malformed: false,
                ..CollectorConfig::default()
            },
        );
        assert!(strict.is_empty());
    }

    #[test]
    fn test_double_start_rejected() {
        let mut collector = StreamCollector::new(CollectorConfig::default());
        // An endless reader keeps the collector running.
        collector.start(std::io::BufReader::new(std::io::repeat(b'\n'))).unwrap();
        assert!(matches!(
            collector.start(Cursor::new(String::new())),
            Err(CollectorError::AlreadyRunning)
        ));
        collector.stop();
        assert!(!collector.is_running());
    }
}
