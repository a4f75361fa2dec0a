//! Performance counter files
//!
//! HPX writes one CSV file per run: a header with counter names followed
//! by one line per sample.

use crate::error::{IoResultExt, Result, ScaleBenchError};
use std::path::Path;

/// Counter values of one run, column-wise
#[derive(Debug, Clone, PartialEq)]
pub struct CounterTable {
    pub names: Vec<String>,
    /// One column of samples per counter
    pub columns: Vec<Vec<f64>>,
}

impl CounterTable {
    /// Read a counter file
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ScaleBenchError::MissingResult(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).with_path(path)?;
        Self::parse(&content).map_err(|message| ScaleBenchError::parse(path, message))
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        let mut lines = content.lines().filter(|line| !line.trim().is_empty());

        let names: Vec<String> = lines
            .next()
            .ok_or("empty counter file")?
            .split(',')
            .map(|name| name.trim().to_string())
            .collect();

        let mut columns = vec![Vec::new(); names.len()];

        for (idx, line) in lines.enumerate() {
            let fields: Vec<&str> = line.split(',').collect();

            if fields.len() != names.len() {
                return Err(format!(
                    "line {}: {} values for {} counters",
                    idx + 2,
                    fields.len(),
                    names.len()
                ));
            }

            for (column, field) in columns.iter_mut().zip(fields) {
                let value = field
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| format!("line {}: {}: '{}'", idx + 2, e, field))?;
                column.push(value);
            }
        }

        // Idle rates are reported in units of 0.01%
        for (name, column) in names.iter().zip(columns.iter_mut()) {
            if name.contains("idle-rate") {
                column.iter_mut().for_each(|value| *value /= 100.0);
            }
        }

        Ok(Self { names, columns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_counters() {
        let content = "/threads{locality#0/total}/idle-rate,/runtime{locality#0/total}/uptime\n\
                       1250,1.5\n\
                       2500,3.0\n";
        let table = CounterTable::parse(content).unwrap();

        assert_eq!(table.names.len(), 2);
        assert_eq!(table.columns[0], vec![12.5, 25.0]);
        assert_eq!(table.columns[1], vec![1.5, 3.0]);
    }

    #[test]
    fn test_ragged_line_rejected() {
        assert!(CounterTable::parse("a,b\n1\n").is_err());
        assert!(CounterTable::parse("a\nx\n").is_err());
        assert!(CounterTable::parse("").is_err());
    }

    #[test]
    fn test_missing_counter_file() {
        let err = CounterTable::read(Path::new("/nonexistent/counter-1.csv")).unwrap_err();
        assert!(matches!(err, ScaleBenchError::MissingResult(_)));
    }
}
