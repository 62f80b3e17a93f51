//! Collection statistics.
//!
//! Counts what the agent has captured and produced across runs, so users can
//! see how much data has been collected without opening the raw files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for the current process, optionally persisted.
#[derive(Debug)]
pub struct CollectionStats {
    /// Key events handled by the session tracker
    key_events: AtomicU64,
    /// Capture sessions completed
    sessions_recorded: AtomicU64,
    /// Text blocks analyzed with simulated features
    text_analyses: AtomicU64,
    /// Records appended to the feature summary
    records_appended: AtomicU64,
    /// Process start time
    started_at: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl CollectionStats {
    pub fn new() -> Self {
        Self {
            key_events: AtomicU64::new(0),
            sessions_recorded: AtomicU64::new(0),
            text_analyses: AtomicU64::new(0),
            records_appended: AtomicU64::new(0),
            started_at: Utc::now(),
            persist_path: None,
        }
    }

    /// Create stats that resume from, and save to, `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!("Could not load previous collection stats: {}", e);
        }

        stats
    }

    pub fn record_key_events(&self, count: u64) {
        self.key_events.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_session(&self) {
        self.sessions_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_text_analysis(&self) {
        self.text_analyses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_appended(&self) {
        self.records_appended.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            key_events: self.key_events.load(Ordering::Relaxed),
            sessions_recorded: self.sessions_recorded.load(Ordering::Relaxed),
            text_analyses: self.text_analyses.load(Ordering::Relaxed),
            records_appended: self.records_appended.load(Ordering::Relaxed),
            started_at: self.started_at,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Collection Statistics:\n\
             - Key events processed: {}\n\
             - Sessions recorded: {}\n\
             - Text analyses: {}\n\
             - Feature records appended: {}",
            stats.key_events, stats.sessions_recorded, stats.text_analyses, stats.records_appended
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.snapshot();
            let persisted = PersistedStats {
                key_events: stats.key_events,
                sessions_recorded: stats.sessions_recorded,
                text_analyses: stats.text_analyses,
                records_appended: stats.records_appended,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.key_events
                    .store(persisted.key_events, Ordering::Relaxed);
                self.sessions_recorded
                    .store(persisted.sessions_recorded, Ordering::Relaxed);
                self.text_analyses
                    .store(persisted.text_analyses, Ordering::Relaxed);
                self.records_appended
                    .store(persisted.records_appended, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for CollectionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub key_events: u64,
    pub sessions_recorded: u64,
    pub text_analyses: u64,
    pub records_appended: u64,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    key_events: u64,
    sessions_recorded: u64,
    text_analyses: u64,
    records_appended: u64,
    last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_counting() {
        let stats = CollectionStats::new();
        stats.record_key_events(12);
        stats.record_session();
        stats.record_appended();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.key_events, 12);
        assert_eq!(snapshot.sessions_recorded, 1);
        assert_eq!(snapshot.text_analyses, 0);
        assert_eq!(snapshot.records_appended, 1);
    }

    #[test]
    fn test_persistence_resumes_counts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.json");

        let stats = CollectionStats::with_persistence(path.clone());
        stats.record_text_analysis();
        stats.record_text_analysis();
        stats.save().unwrap();

        let resumed = CollectionStats::with_persistence(path);
        assert_eq!(resumed.snapshot().text_analyses, 2);
    }

    #[test]
    fn test_summary_format() {
        let summary = CollectionStats::new().summary();
        assert!(summary.contains("Key events processed"));
        assert!(summary.contains("Feature records appended"));
    }
}
