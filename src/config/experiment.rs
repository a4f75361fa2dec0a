//! Experiment description
//!
//! The experiment document fixes the work: time steps, array shape and
//! partition shape. Together with the experiment kind and the program to
//! benchmark it determines what every benchmark run computes.

use crate::error::{read_json, Result, ScaleBenchError};
use crate::job::{format_slurm_time, parse_slurm_time};
use crate::shape::ShapeSpec;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of scalability experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentKind {
    /// Vary the partition shape at a fixed number of workers
    PartitionShape,
    /// Fixed problem size, increasing number of workers
    StrongScaling,
    /// Problem size growing with the number of workers
    WeakScaling,
}

impl ExperimentKind {
    /// Name as used in result paths and datasets
    pub fn name(&self) -> &'static str {
        match self {
            Self::PartitionShape => "partition_shape",
            Self::StrongScaling => "strong_scaling",
            Self::WeakScaling => "weak_scaling",
        }
    }

    /// Parse a kind from its name
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "partition_shape" => Ok(Self::PartitionShape),
            "strong_scaling" => Ok(Self::StrongScaling),
            "weak_scaling" => Ok(Self::WeakScaling),
            other => Err(ScaleBenchError::dataset(format!(
                "Unknown experiment kind '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ExperimentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maximum duration of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxDuration {
    Seconds(u64),
    /// SLURM time string, e.g. `1-12:00:00`
    Formatted(String),
}

impl MaxDuration {
    /// Time limit as passed to SLURM
    pub fn to_slurm_time(&self) -> Result<String> {
        match self {
            Self::Seconds(seconds) => Ok(format_slurm_time(*seconds)),
            Self::Formatted(text) => parse_slurm_time(text)
                .map(format_slurm_time)
                .ok_or_else(|| ScaleBenchError::config(format!("Invalid max_duration: '{}'", text))),
        }
    }
}

/// Experiment settings as read from the experiment document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<MaxDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tree_depth: Option<u64>,
    pub nr_time_steps: u64,
    pub array: ShapeSpec,
    pub partition: ShapeSpec,
    #[serde(default)]
    pub description: String,
}

impl ExperimentSettings {
    /// Load an experiment document
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

/// An experiment: settings, kind and the program to benchmark
#[derive(Debug, Clone)]
pub struct Experiment {
    pub kind: ExperimentKind,
    pub settings: ExperimentSettings,
    /// Path of the executable being benchmarked
    pub program: PathBuf,
}

impl Experiment {
    /// Combine and validate experiment settings
    pub fn new(kind: ExperimentKind, settings: ExperimentSettings, program: PathBuf) -> Result<Self> {
        let experiment = Self {
            kind,
            settings,
            program,
        };
        experiment.validate()?;
        Ok(experiment)
    }

    /// Base name of the benchmarked executable
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Job name used when submitting to a scheduler
    pub fn job_name(&self) -> String {
        format!("{}-{}", self.kind.name(), self.program_name())
    }

    /// Check invariants not expressed by the types
    pub fn validate(&self) -> Result<()> {
        let settings = &self.settings;

        if settings.nr_time_steps == 0 {
            return Err(ScaleBenchError::config("nr_time_steps must be >= 1"));
        }

        if self.program.as_os_str().is_empty() {
            return Err(ScaleBenchError::config("Program path must not be empty"));
        }

        if settings.array.rank() != settings.partition.rank() {
            return Err(ScaleBenchError::config(format!(
                "Array rank ({}) and partition rank ({}) differ",
                settings.array.rank(),
                settings.partition.rank()
            )));
        }

        if let Some(max_duration) = &settings.max_duration {
            max_duration.to_slurm_time()?;
        }

        Ok(())
    }
}
