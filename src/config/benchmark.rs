//! Benchmark description
//!
//! The benchmark document names the scenario, the number of repeated
//! measurements per run and the pool of workers to sweep over.

use crate::error::{read_json, Result, ScaleBenchError};
use crate::worker::{LocalityPer, WorkerRange, WorkerType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

fn default_scenario() -> String {
    "default".to_string()
}

/// Benchmark settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benchmark {
    /// Name of the scenario, used in result paths
    #[serde(default = "default_scenario", alias = "scenario_name")]
    pub scenario: String,
    /// Number of measurements per benchmark run
    pub count: usize,
    /// Hardware unit hosting one locality
    pub locality_per: LocalityPer,
    pub worker: WorkerSpec,
    /// Runtime specific settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hpx: Option<HpxSettings>,
}

/// Kind of worker and the pool of worker counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSpec {
    #[serde(rename = "type")]
    pub worker_type: WorkerType,
    pub pool: PoolSpec,
}

/// Worker pool as written in configuration
///
/// Variants are tried in order, so the most specific shapes come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PoolSpec {
    Multiplied {
        min_size: u64,
        max_size: u64,
        multiplier: u64,
    },
    Incremented {
        min_size: u64,
        max_size: u64,
        incrementor: u64,
    },
    /// Every count between the bounds
    Range { min_size: u64, max_size: u64 },
    Single { size: u64 },
}

impl PoolSpec {
    /// Validate and convert into a worker range
    pub fn to_range(&self) -> Result<WorkerRange> {
        match *self {
            Self::Multiplied {
                min_size,
                max_size,
                multiplier,
            } => WorkerRange::multiplied(min_size, multiplier, max_size),
            Self::Incremented {
                min_size,
                max_size,
                incrementor,
            } => WorkerRange::incremented(min_size, incrementor, max_size),
            Self::Range { min_size, max_size } => WorkerRange::incremented(min_size, 1, max_size),
            Self::Single { size } => WorkerRange::empty(size),
        }
    }
}

/// Settings passed on to the HPX runtime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HpxSettings {
    /// Performance counter arguments; each entry maps one option name to a
    /// value or a list of values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_counters: Option<Vec<Map<String, Value>>>,
    /// Interval between counter samples, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_interval: Option<u64>,
}

impl HpxSettings {
    /// Counter arguments as `--hpx:<key>="<value>"` flags
    pub fn counter_arguments(&self) -> Result<Vec<String>> {
        let mut arguments = Vec::new();

        for entry in self.performance_counters.iter().flatten() {
            if entry.len() != 1 {
                return Err(ScaleBenchError::config(format!(
                    "Performance counter entry must hold exactly one option: {}",
                    Value::Object(entry.clone())
                )));
            }

            for (key, value) in entry {
                match value {
                    Value::Array(items) => {
                        for item in items {
                            arguments.push(format!("--hpx:{}=\"{}\"", key, plain(item)));
                        }
                    }
                    other => arguments.push(format!("--hpx:{}=\"{}\"", key, plain(other))),
                }
            }
        }

        if let Some(interval) = self.counter_interval {
            arguments.push(format!("--hpx:print-counter-interval={}", interval));
        }

        Ok(arguments)
    }

    /// Whether counters are requested at all
    pub fn has_counters(&self) -> bool {
        self.performance_counters
            .as_ref()
            .is_some_and(|counters| !counters.is_empty())
    }
}

/// JSON value without the quotes around strings
fn plain(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl Benchmark {
    /// Load and validate a benchmark document
    pub fn load(path: &Path) -> Result<Self> {
        let benchmark: Self = read_json(path)?;
        benchmark
            .validate()
            .map_err(|e| e.with_context(format!("Benchmark settings '{}'", path.display())))?;
        Ok(benchmark)
    }

    /// Check invariants not expressed by the types
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(ScaleBenchError::config("Benchmark count must be >= 1"));
        }

        if self.scenario.trim().is_empty() || self.scenario.contains('/') {
            return Err(ScaleBenchError::config(format!(
                "Invalid scenario name: '{}'",
                self.scenario
            )));
        }

        self.worker.pool.to_range()?;

        if let Some(hpx) = &self.hpx {
            hpx.counter_arguments()?;
        }

        Ok(())
    }

    /// Worker counts to sweep over
    pub fn worker_range(&self) -> Result<WorkerRange> {
        self.worker.pool.to_range()
    }

    /// Performance counter settings, when counters are requested
    pub fn counters(&self) -> Option<&HpxSettings> {
        self.hpx.as_ref().filter(|hpx| hpx.has_counters())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn benchmark(pool: Value) -> Benchmark {
        serde_json::from_value(json!({
            "scenario": "threads",
            "count": 3,
            "locality_per": "numa_node",
            "worker": { "type": "thread", "pool": pool }
        }))
        .unwrap()
    }

    #[test]
    fn test_pool_variants() {
        let multiplied = benchmark(json!({"min_size": 1, "max_size": 64, "multiplier": 2}));
        assert_eq!(multiplied.worker_range().unwrap().nr_permutations(), 7);

        let incremented = benchmark(json!({"min_size": 2, "max_size": 12, "incrementor": 2}));
        assert_eq!(
            incremented.worker_range().unwrap().sizes(),
            vec![2, 4, 6, 8, 10, 12]
        );

        let range = benchmark(json!({"min_size": 1, "max_size": 4}));
        assert_eq!(range.worker.pool, PoolSpec::Range { min_size: 1, max_size: 4 });
        assert_eq!(range.worker_range().unwrap().sizes(), vec![1, 2, 3, 4]);

        let single = benchmark(json!({"size": 6}));
        assert_eq!(single.worker_range().unwrap(), WorkerRange::Empty { size: 6 });
    }

    #[test]
    fn test_defaults() {
        let benchmark: Benchmark = serde_json::from_value(json!({
            "count": 1,
            "locality_per": "cluster_node",
            "worker": { "type": "thread", "pool": {"size": 4} }
        }))
        .unwrap();

        assert_eq!(benchmark.scenario, "default");
        assert!(benchmark.hpx.is_none());
        assert!(benchmark.counters().is_none());
        benchmark.validate().unwrap();
    }

    #[test]
    fn test_invalid_benchmarks() {
        let mut zero_count = benchmark(json!({"size": 1}));
        zero_count.count = 0;
        assert!(zero_count.validate().unwrap_err().is_config_error());

        let bad_multiplier = benchmark(json!({"min_size": 1, "max_size": 8, "multiplier": 1}));
        assert!(bad_multiplier.validate().is_err());

        let inverted = benchmark(json!({"min_size": 8, "max_size": 1}));
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_counter_arguments() {
        let hpx: HpxSettings = serde_json::from_value(json!({
            "performance_counters": [
                {"print-counter": ["/threads{locality#*/total}/idle-rate", "/runtime/uptime"]},
                {"print-counter-interval": 100}
            ]
        }))
        .unwrap();

        assert!(hpx.has_counters());
        assert_eq!(
            hpx.counter_arguments().unwrap(),
            vec![
                "--hpx:print-counter=\"/threads{locality#*/total}/idle-rate\"".to_string(),
                "--hpx:print-counter=\"/runtime/uptime\"".to_string(),
                "--hpx:print-counter-interval=\"100\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_counter_entry_with_two_options_rejected() {
        let hpx: HpxSettings = serde_json::from_value(json!({
            "performance_counters": [{"a": 1, "b": 2}]
        }))
        .unwrap();
        assert!(hpx.counter_arguments().is_err());
    }
}
