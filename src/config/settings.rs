//! Command line settings for ScaleBench
//!
//! Defines the CLI arguments of the three steps of an experiment:
//! generating the job script, importing the raw results and exporting the
//! scaling statistics.

use super::ExperimentKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// ScaleBench - scalability experiments for partitioned-array programs
#[derive(Parser, Debug, Clone)]
#[command(name = "scalebench")]
#[command(author = "ScaleBench Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate, import and analyse scalability benchmarks on HPC clusters")]
#[command(long_about = r#"
ScaleBench generates scripts running a benchmark program over a range of
worker counts or partition shapes, imports the results the program writes,
and computes speed-up, efficiency and throughput.

Examples:
  scalebench generate --kind strong-scaling --cluster eejit.json \
      --benchmark threads.json --experiment flow.json \
      --program /opt/bin/lue_benchmark --script run.sh --result-prefix /scratch/results
  scalebench import /scratch/results/eejit/threads/strong_scaling
  scalebench export /scratch/results/eejit/threads/strong_scaling --output scaling.csv
  scalebench detect-cluster > laptop.json
"#)]
pub struct CliArgs {
    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only, no progress bar)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate the script running all benchmark cases and seed the raw dataset
    #[command(name = "generate")]
    Generate(GenerateArgs),

    /// Import raw results and compute scaling statistics
    #[command(name = "import")]
    Import {
        /// Experiment workspace holding raw.json
        #[arg(value_name = "WORKSPACE")]
        workspace: PathBuf,

        /// Origin of the time points (ISO 8601); defaults to the earliest start
        #[arg(long, value_name = "TIMESTAMP")]
        epoch: Option<String>,
    },

    /// Export scaling statistics as CSV
    #[command(name = "export")]
    Export {
        /// Experiment workspace holding scaling.json
        #[arg(value_name = "WORKSPACE")]
        workspace: PathBuf,

        /// CSV file to write
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,
    },

    /// Describe the local machine as a cluster configuration
    #[command(name = "detect-cluster")]
    DetectCluster {
        /// Cluster name (default: hostname)
        #[arg(long)]
        name: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
}

/// Arguments of the generate step
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Kind of experiment
    #[arg(long, value_enum)]
    pub kind: ExperimentKind,

    /// Cluster settings (JSON)
    #[arg(long, value_name = "PATH")]
    pub cluster: PathBuf,

    /// Benchmark settings (JSON)
    #[arg(long, value_name = "PATH")]
    pub benchmark: PathBuf,

    /// Experiment settings (JSON)
    #[arg(long, value_name = "PATH")]
    pub experiment: PathBuf,

    /// Benchmark executable
    #[arg(long, value_name = "PATH")]
    pub program: PathBuf,

    /// Script to write
    #[arg(long, value_name = "PATH")]
    pub script: PathBuf,

    /// Directory below which results are stored
    #[arg(long, value_name = "PATH")]
    pub result_prefix: PathBuf,
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    #[default]
    Json,
}
