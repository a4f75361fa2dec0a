//! Location of scripts, results and datasets on disk

use crate::shape::shape_label;
use std::path::{Path, PathBuf};

/// File name of the dataset holding the imported raw results
pub const RAW_DATASET_NAME: &str = "raw.json";

/// File name of the dataset holding the scaling statistics
pub const SCALING_DATASET_NAME: &str = "scaling.json";

/// Directory layout of one experiment's results
///
/// `<prefix>/<cluster>/<scenario>/<kind>/<array>/<partition>/<nr_workers>.json`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLayout {
    workspace: PathBuf,
}

impl ResultLayout {
    pub fn new(prefix: &Path, cluster_name: &str, scenario: &str, kind: &str) -> Self {
        Self {
            workspace: prefix.join(cluster_name).join(scenario).join(kind),
        }
    }

    /// Layout rooted at an existing workspace directory
    pub fn at(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn raw_dataset(&self) -> PathBuf {
        self.workspace.join(RAW_DATASET_NAME)
    }

    pub fn scaling_dataset(&self) -> PathBuf {
        self.workspace.join(SCALING_DATASET_NAME)
    }

    /// Directory holding the results of one array/partition combination
    pub fn result_directory(&self, array_shape: &[u64], partition_shape: &[u64]) -> PathBuf {
        self.workspace
            .join(shape_label(array_shape))
            .join(shape_label(partition_shape))
    }

    /// Raw result file of one benchmark run
    pub fn result_file(&self, array_shape: &[u64], partition_shape: &[u64], nr_workers: u64) -> PathBuf {
        self.result_directory(array_shape, partition_shape)
            .join(format!("{}.json", nr_workers))
    }

    /// Performance counter file of one benchmark run
    pub fn counter_file(&self, array_shape: &[u64], partition_shape: &[u64], nr_workers: u64) -> PathBuf {
        self.result_directory(array_shape, partition_shape)
            .join(format!("counter-{}.csv", nr_workers))
    }

    /// Output file of a batch job, optionally one per worker count
    pub fn job_output(&self, script: &Path, nr_workers: Option<u64>) -> PathBuf {
        let stem = script
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "job".to_string());

        match nr_workers {
            Some(nr_workers) => self.workspace.join(format!("{}-{}.out", stem, nr_workers)),
            None => self.workspace.join(format!("{}.out", stem)),
        }
    }
}
