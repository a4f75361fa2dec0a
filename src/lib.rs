//! # ScaleBench - Scalability Benchmarks for HPC Clusters
//!
//! ScaleBench drives scalability experiments of programs built on a
//! partitioned-array runtime. An experiment runs in three steps:
//!
//! 1. **Generate**: combine cluster, benchmark and experiment settings into
//!    a shell script or a set of SLURM job submissions, one benchmark run
//!    per worker count or partition shape.
//! 2. **Run**: the script is executed outside of ScaleBench. Every run
//!    writes a JSON result file below the result prefix.
//! 3. **Import**: the result files are collected into a dataset, from
//!    which speed-up, efficiency and throughput are computed.
//!
//! ## Experiment kinds
//!
//! - **Strong scaling**: fixed problem size, increasing number of workers
//! - **Weak scaling**: problem size growing with the number of workers
//! - **Partition shape**: fixed number of workers, varying partition shape
//!
//! ## Quick Start
//!
//! ```no_run
//! use scalebench::config::{Benchmark, Cluster, Experiment, ExperimentKind, ExperimentSettings};
//! use scalebench::core::{generate_plan, BenchmarkPlan};
//! use std::path::{Path, PathBuf};
//!
//! let cluster = Cluster::load(Path::new("eejit.json")).unwrap();
//! let benchmark = Benchmark::load(Path::new("threads.json")).unwrap();
//! let settings = ExperimentSettings::load(Path::new("flow.json")).unwrap();
//! let experiment = Experiment::new(
//!     ExperimentKind::StrongScaling,
//!     settings,
//!     PathBuf::from("/opt/bin/lue_benchmark"),
//! )
//! .unwrap();
//!
//! let plan = BenchmarkPlan::new(cluster, benchmark, experiment, Path::new("/scratch/results")).unwrap();
//! let summary = generate_plan(&plan, Path::new("run.sh")).unwrap();
//! summary.print();
//! ```
//!
//! ## Importing Results
//!
//! ```no_run
//! use scalebench::import::ResultImporter;
//! use scalebench::progress::ProgressReporter;
//! use std::path::Path;
//!
//! let outcome = ResultImporter::new(Path::new("/scratch/results/eejit/threads/strong_scaling"))
//!     .with_progress(ProgressReporter::new())
//!     .import()
//!     .unwrap();
//! println!("{:?}", outcome);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod dataset;
pub mod error;
pub mod import;
pub mod job;
pub mod progress;
pub mod shape;
pub mod stats;
pub mod system;
pub mod worker;

// Re-export commonly used types
pub use crate::config::{Benchmark, Cluster, Experiment, ExperimentKind};
pub use crate::core::BenchmarkPlan;
pub use crate::error::{Result, ScaleBenchError};
pub use crate::progress::ProgressReporter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use scalebench::prelude::*;
    //! ```

    pub use crate::config::{Benchmark, Cluster, Experiment, ExperimentKind, ExperimentSettings};
    pub use crate::core::{export, generate, generate_plan, import, BenchmarkCase, BenchmarkPlan};
    pub use crate::dataset::Dataset;
    pub use crate::error::{Result, ScaleBenchError};
    pub use crate::import::{ImportOutcome, ResultImporter};
    pub use crate::job::{JobScriptBuilder, ResultLayout};
    pub use crate::progress::ProgressReporter;
    pub use crate::shape::{Shape, ShapeSpec};
    pub use crate::stats::{compute_scaling, ScalingModel, ScalingTable};
    pub use crate::worker::{WorkerAllocation, WorkerRange, WorkerType};
}
