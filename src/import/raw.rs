//! Raw benchmark results, as written by the benchmarked program

use crate::error::{IoResultExt, Result, ScaleBenchError};
use crate::shape::Shape;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct RawDocument {
    start: String,
    unit: String,
    timings: Vec<RawTiming>,
    environment: RawEnvironment,
    task: RawTask,
}

#[derive(Debug, Deserialize)]
struct RawTiming {
    start: String,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct RawEnvironment {
    #[serde(default)]
    nr_workers: Option<u64>,
    #[serde(default)]
    nr_localities: Option<u64>,
    #[serde(default)]
    nr_threads: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    array_shape: Shape,
    partition_shape: Shape,
}

/// Parse an ISO 8601 timestamp; timestamps without offset are taken as UTC
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| ScaleBenchError::InvalidTimestamp(text.to_string()))
}

/// Result of one benchmark run
#[derive(Debug, Clone, PartialEq)]
pub struct RawMeasurement {
    pub path: PathBuf,
    pub start: DateTime<Utc>,
    /// Unit of the durations
    pub unit: String,
    pub timing_starts: Vec<DateTime<Utc>>,
    /// One duration per repeated measurement
    pub durations: Vec<f64>,
    pub nr_workers: u64,
    pub nr_threads: Option<u64>,
    pub array_shape: Shape,
    pub partition_shape: Shape,
}

impl RawMeasurement {
    /// Read a raw result file
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ScaleBenchError::MissingResult(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).with_path(path)?;
        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        let document: RawDocument =
            serde_json::from_str(content).map_err(|e| ScaleBenchError::parse(path, e))?;

        let nr_workers = document
            .environment
            .nr_workers
            .or(document.environment.nr_localities)
            .ok_or_else(|| {
                ScaleBenchError::parse(path, "environment holds neither nr_workers nor nr_localities")
            })?;

        if document.timings.is_empty() {
            return Err(ScaleBenchError::parse(path, "no timings"));
        }

        let timing_starts = document
            .timings
            .iter()
            .map(|timing| parse_timestamp(&timing.start))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            path: path.to_path_buf(),
            start: parse_timestamp(&document.start)?,
            unit: document.unit,
            timing_starts,
            durations: document.timings.iter().map(|timing| timing.duration).collect(),
            nr_workers,
            nr_threads: document.environment.nr_threads,
            array_shape: document.task.array_shape,
            partition_shape: document.task.partition_shape,
        })
    }

    /// Whole seconds between `epoch` and the start of this run
    pub fn offset_from(&self, epoch: &DateTime<Utc>) -> Result<u64> {
        if self.start < *epoch {
            return Err(ScaleBenchError::EpochAfterStart {
                epoch: epoch.to_rfc3339(),
                start: self.start.to_rfc3339(),
            });
        }

        Ok((self.start - *epoch).num_seconds() as u64)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Write a raw result file as the benchmarked program would
    pub(crate) fn write_raw_result(
        path: &Path,
        start: &str,
        nr_workers: u64,
        array_shape: &[u64],
        partition_shape: &[u64],
        durations: &[f64],
    ) {
        let timings: Vec<_> = durations
            .iter()
            .map(|duration| json!({"start": start, "duration": duration}))
            .collect();

        let document = json!({
            "start": start,
            "unit": "millisecond",
            "timings": timings,
            "environment": {"nr_workers": nr_workers, "nr_threads": nr_workers},
            "task": {"array_shape": array_shape, "partition_shape": partition_shape}
        });

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_string_pretty(&document).unwrap()).unwrap();
    }

    #[test]
    fn test_parse_timestamps() {
        let utc = parse_timestamp("2021-03-04T10:00:00+00:00").unwrap();
        let offset = parse_timestamp("2021-03-04T11:00:00+01:00").unwrap();
        let naive = parse_timestamp("2021-03-04T10:00:00.250").unwrap();

        assert_eq!(utc, offset);
        assert_eq!((naive - utc).num_milliseconds(), 250);
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(ScaleBenchError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_read_raw_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("4.json");
        write_raw_result(&path, "2021-03-04T10:00:00+00:00", 4, &[100, 100], &[10, 10], &[5.0, 6.0]);

        let measurement = RawMeasurement::read(&path).unwrap();
        assert_eq!(measurement.nr_workers, 4);
        assert_eq!(measurement.durations, vec![5.0, 6.0]);
        assert_eq!(measurement.unit, "millisecond");
        assert_eq!(measurement.array_shape, vec![100, 100]);
    }

    #[test]
    fn test_nr_localities_fallback() {
        let content = json!({
            "start": "2021-03-04T10:00:00Z",
            "unit": "second",
            "timings": [{"start": "2021-03-04T10:00:00Z", "duration": 1}],
            "environment": {"nr_localities": 8},
            "task": {"array_shape": [10], "partition_shape": [5]}
        })
        .to_string();

        let measurement = RawMeasurement::parse(Path::new("8.json"), &content).unwrap();
        assert_eq!(measurement.nr_workers, 8);
        assert_eq!(measurement.nr_threads, None);
    }

    #[test]
    fn test_missing_result() {
        let err = RawMeasurement::read(Path::new("/nonexistent/1.json")).unwrap_err();
        assert!(matches!(err, ScaleBenchError::MissingResult(_)));
        assert_eq!(err.path().unwrap(), &PathBuf::from("/nonexistent/1.json"));
    }

    #[test]
    fn test_offset_from_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.json");
        write_raw_result(&path, "2021-03-04T10:01:30+00:00", 1, &[10], &[5], &[1.0]);
        let measurement = RawMeasurement::read(&path).unwrap();

        let epoch = parse_timestamp("2021-03-04T10:00:00+00:00").unwrap();
        assert_eq!(measurement.offset_from(&epoch).unwrap(), 90);

        let late_epoch = parse_timestamp("2021-03-04T11:00:00+00:00").unwrap();
        assert!(matches!(
            measurement.offset_from(&late_epoch),
            Err(ScaleBenchError::EpochAfterStart { .. })
        ));
    }
}
