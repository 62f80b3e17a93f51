//! Append-only feature summary store.
//!
//! One CSV row per feature vector, with the header
//! `avg_dwell,avg_flight,speed,pauses,errors,label` written once when the
//! file is created or found empty. Records are never updated or removed.
//!
//! There is no locking: concurrent writers from several processes can
//! interleave rows.

pub mod rows;

use crate::core::features::FeatureVector;
use crate::error::Result;
use rows::{decode_row, encode_row, parse_number, read_record, Header};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

/// Column names of the feature summary, in write order.
pub const SUMMARY_COLUMNS: [&str; 6] = ["avg_dwell", "avg_flight", "speed", "pauses", "errors", "label"];

/// Durable log of feature vectors.
#[derive(Debug, Clone)]
pub struct FeatureStore {
    path: PathBuf,
}

impl FeatureStore {
    /// Open a store at `path`. Nothing is created until the first append.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, writing the header first if the file is new.
    pub fn append(&self, features: &FeatureVector) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut buf = String::new();
        if file.metadata()?.len() == 0 {
            buf.push_str(&encode_row(&SUMMARY_COLUMNS));
            buf.push('\n');
        }

        let avg_dwell = features.avg_dwell.to_string();
        let avg_flight = features.avg_flight.to_string();
        let speed = features.speed.to_string();
        let pauses = features.pauses.to_string();
        let errors = features.errors.to_string();
        let row: [&str; 6] = [
            &avg_dwell,
            &avg_flight,
            &speed,
            &pauses,
            &errors,
            &features.label,
        ];
        buf.push_str(&encode_row(&row));
        buf.push('\n');

        // One write per record keeps header and row together.
        file.write_all(buf.as_bytes())?;
        tracing::debug!("Appended {} record to {:?}", features.label, self.path);
        Ok(())
    }

    /// Read every record in append order.
    ///
    /// A missing file is an IO error; malformed content is a parse error.
    pub fn read_all(&self) -> Result<Vec<FeatureVector>> {
        let file = std::fs::File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let header_line = match read_record(&mut reader)? {
            Some(line) => line,
            None => return Ok(Vec::new()),
        };
        let header = Header::parse(&header_line, &SUMMARY_COLUMNS)?;

        let mut records = Vec::new();
        while let Some(line) = read_record(&mut reader)? {
            if line.trim().is_empty() {
                continue;
            }
            let row = decode_row(&line)?;
            records.push(FeatureVector {
                avg_dwell: parse_number(header.field(&row, "avg_dwell")?, "avg_dwell")?,
                avg_flight: parse_number(header.field(&row, "avg_flight")?, "avg_flight")?,
                speed: parse_number(header.field(&row, "speed")?, "speed")?,
                pauses: parse_count(header.field(&row, "pauses")?, "pauses")?,
                errors: parse_count(header.field(&row, "errors")?, "errors")?,
                label: header.field(&row, "label")?.to_string(),
            });
        }
        Ok(records)
    }
}

// Counts written by other tools may carry a trailing ".0".
fn parse_count(value: &str, column: &str) -> Result<u32> {
    match value.trim().strip_suffix(".0") {
        Some(whole) => parse_number(whole, column),
        None => parse_number(value, column),
    }
}

/// Mean feature values of one label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelSummary {
    pub count: usize,
    pub avg_dwell: f64,
    pub avg_flight: f64,
    pub speed: f64,
    pub pauses: f64,
    pub errors: f64,
}

/// Per-label counts and feature means, keyed by label.
pub fn summarize(records: &[FeatureVector]) -> BTreeMap<String, LabelSummary> {
    let mut sums: BTreeMap<String, LabelSummary> = BTreeMap::new();
    for record in records {
        let entry = sums.entry(record.label.clone()).or_default();
        entry.count += 1;
        entry.avg_dwell += record.avg_dwell;
        entry.avg_flight += record.avg_flight;
        entry.speed += record.speed;
        entry.pauses += f64::from(record.pauses);
        entry.errors += f64::from(record.errors);
    }

    for summary in sums.values_mut() {
        let n = summary.count as f64;
        summary.avg_dwell /= n;
        summary.avg_flight /= n;
        summary.speed /= n;
        summary.pauses /= n;
        summary.errors /= n;
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use tempfile::tempdir;

    fn vector(speed: f64, label: &str) -> FeatureVector {
        FeatureVector {
            avg_dwell: 0.142,
            avg_flight: 0.118,
            speed,
            pauses: 1,
            errors: 0,
            label: label.to_string(),
        }
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempdir().unwrap();
        let store = FeatureStore::open(dir.path().join("features_summary.csv"));

        store.append(&vector(6.0, "low")).unwrap();
        store.append(&vector(2.0, "high")).unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.matches("avg_dwell").count(), 1);
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_read_all_in_order() {
        let dir = tempdir().unwrap();
        let store = FeatureStore::open(dir.path().join("nested").join("summary.csv"));
        let written = vec![vector(6.0, "low"), vector(2.5, "high"), vector(4.0, "low")];
        for record in &written {
            store.append(record).unwrap();
        }
        assert_eq!(store.read_all().unwrap(), written);
    }

    #[test]
    fn test_multiline_label_round_trip() {
        let dir = tempdir().unwrap();
        let store = FeatureStore::open(dir.path().join("summary.csv"));
        let written = vec![
            vector(3.0, "high\nafter lunch"),
            vector(5.0, "low\r\nmorning"),
            vector(6.0, "low"),
        ];
        for record in &written {
            store.append(record).unwrap();
        }
        assert_eq!(store.read_all().unwrap(), written);
    }

    #[test]
    fn test_empty_existing_file_gets_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        std::fs::write(&path, "").unwrap();

        let store = FeatureStore::open(&path);
        store.append(&vector(3.0, "low")).unwrap();
        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let store = FeatureStore::open(dir.path().join("absent.csv"));
        match store.read_all() {
            Err(PipelineError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected IO error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_column_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        std::fs::write(&path, "avg_dwell,avg_flight,speed,label\n0.1,0.1,3.0,low\n").unwrap();
        assert!(matches!(
            FeatureStore::open(&path).read_all(),
            Err(PipelineError::Parse(_))
        ));
    }

    #[test]
    fn test_reads_foreign_column_order_and_float_counts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        std::fs::write(
            &path,
            "label,speed,pauses,errors,avg_dwell,avg_flight\nhigh,2.1,3.0,2,0.25,0.21\n",
        )
        .unwrap();

        let records = FeatureStore::open(&path).read_all().unwrap();
        assert_eq!(records[0].pauses, 3);
        assert_eq!(records[0].errors, 2);
        assert_eq!(records[0].label, "high");
    }

    #[test]
    fn test_label_with_comma_survives() {
        let dir = tempdir().unwrap();
        let store = FeatureStore::open(dir.path().join("summary.csv"));
        store.append(&vector(3.0, "high, tired")).unwrap();
        assert_eq!(store.read_all().unwrap()[0].label, "high, tired");
    }

    #[test]
    fn test_summarize() {
        let records = vec![vector(6.0, "low"), vector(4.0, "low"), vector(2.0, "high")];
        let summary = summarize(&records);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary["low"].count, 2);
        assert_eq!(summary["low"].speed, 5.0);
        assert_eq!(summary["high"].pauses, 1.0);
    }
}
