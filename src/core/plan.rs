//! Benchmark planning
//!
//! A plan combines the cluster, benchmark and experiment settings into the
//! ordered list of benchmark cases to run. The experiment kind is resolved
//! once, into a [`Sweep`], when the plan is built.

use crate::config::{Benchmark, Cluster, Experiment, ExperimentKind, ExperimentSettings, Scheduler};
use crate::dataset::{PropertySet, PropertyValue};
use crate::error::{Result, ScaleBenchError};
use crate::job::ResultLayout;
use crate::shape::{nr_elements, partition_shape_multipliers, scale_array_shape, Shape};
use crate::worker::{WorkerAllocation, WorkerType};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One benchmark run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkCase {
    pub array_shape: Shape,
    pub partition_shape: Shape,
    pub nr_workers: u64,
}

/// What an experiment varies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sweep {
    /// Every array shape combined with every partition shape, at a fixed
    /// number of workers
    PartitionShape {
        array_shapes: Vec<Shape>,
        partition_shapes: Vec<Shape>,
        nr_workers: u64,
    },
    /// Fixed array shape, varying number of workers
    StrongScaling {
        array_shape: Shape,
        partition_shape: Shape,
    },
    /// Array shape proportional to the number of workers
    WeakScaling {
        array_shape_per_worker: Shape,
        partition_shape: Shape,
    },
}

impl Sweep {
    /// Resolve the sweep of an experiment kind
    pub fn resolve(experiment: &Experiment, allocation: &WorkerAllocation) -> Result<Self> {
        let settings = &experiment.settings;

        match experiment.kind {
            ExperimentKind::PartitionShape => {
                if allocation.pool.is_sweep() {
                    return Err(ScaleBenchError::config(
                        "A partition shape experiment runs at a single worker count",
                    ));
                }

                let array_shapes = settings.array.shapes()?;
                let partition_shapes = settings.partition.shapes()?;

                if array_shapes.is_empty() || partition_shapes.is_empty() {
                    return Err(ScaleBenchError::config(
                        "Partition shape experiment has no shapes to benchmark",
                    ));
                }

                Ok(Self::PartitionShape {
                    array_shapes,
                    partition_shapes,
                    nr_workers: allocation.nr_workers(0),
                })
            }
            ExperimentKind::StrongScaling | ExperimentKind::WeakScaling => {
                if allocation.nr_varying_ranges() != 1 {
                    return Err(ScaleBenchError::config(format!(
                        "A scaling experiment needs a sweep over {} workers",
                        allocation.worker_type
                    )));
                }

                if allocation.pool.min_size() != 1 {
                    return Err(ScaleBenchError::config(format!(
                        "A scaling experiment needs a run with one worker as reference, but the worker pool starts at {}",
                        allocation.pool.min_size()
                    )));
                }

                let array_shape = settings.array.single()?;
                let partition_shape = settings.partition.single()?;
                partition_shape_multipliers(&array_shape, &partition_shape)?;

                if experiment.kind == ExperimentKind::StrongScaling {
                    Ok(Self::StrongScaling {
                        array_shape,
                        partition_shape,
                    })
                } else {
                    Ok(Self::WeakScaling {
                        array_shape_per_worker: array_shape,
                        partition_shape,
                    })
                }
            }
        }
    }

    /// Benchmark cases in generation order
    pub fn cases(&self, allocation: &WorkerAllocation) -> Result<Vec<BenchmarkCase>> {
        let cases = match self {
            Self::PartitionShape {
                array_shapes,
                partition_shapes,
                nr_workers,
            } => array_shapes
                .iter()
                .flat_map(|array_shape| {
                    partition_shapes.iter().map(move |partition_shape| BenchmarkCase {
                        array_shape: array_shape.clone(),
                        partition_shape: partition_shape.clone(),
                        nr_workers: *nr_workers,
                    })
                })
                .collect(),
            Self::StrongScaling {
                array_shape,
                partition_shape,
            } => allocation
                .pool
                .sizes()
                .into_iter()
                .map(|nr_workers| BenchmarkCase {
                    array_shape: array_shape.clone(),
                    partition_shape: partition_shape.clone(),
                    nr_workers,
                })
                .collect(),
            Self::WeakScaling {
                array_shape_per_worker,
                partition_shape,
            } => allocation
                .pool
                .sizes()
                .into_iter()
                .map(|nr_workers| {
                    Ok(BenchmarkCase {
                        array_shape: scale_array_shape(array_shape_per_worker, nr_workers)?,
                        partition_shape: partition_shape.clone(),
                        nr_workers,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(cases)
    }

    /// Number of elements each worker processes, for weak scaling
    pub fn nr_elements_per_worker(&self) -> Option<u64> {
        match self {
            Self::WeakScaling {
                array_shape_per_worker,
                ..
            } => Some(nr_elements(array_shape_per_worker)),
            _ => None,
        }
    }
}

/// Everything needed to generate scripts for, and later import, an experiment
#[derive(Debug, Clone)]
pub struct BenchmarkPlan {
    pub cluster: Cluster,
    pub benchmark: Benchmark,
    pub experiment: Experiment,
    pub allocation: WorkerAllocation,
    pub layout: ResultLayout,
    pub sweep: Sweep,
    cases: Vec<BenchmarkCase>,
}

impl BenchmarkPlan {
    /// Validate the settings and enumerate the benchmark cases
    pub fn new(
        cluster: Cluster,
        benchmark: Benchmark,
        experiment: Experiment,
        result_prefix: &Path,
    ) -> Result<Self> {
        cluster.validate()?;
        benchmark.validate()?;
        experiment.validate()?;

        let allocation = WorkerAllocation::resolve(
            benchmark.worker.worker_type,
            benchmark.locality_per,
            benchmark.worker_range()?,
            cluster.node.as_ref(),
        )?;

        if cluster.scheduler == Scheduler::Shell && allocation.worker_type != WorkerType::Thread {
            return Err(ScaleBenchError::config(format!(
                "The shell scheduler runs a single process; worker type '{}' requires SLURM",
                allocation.worker_type
            )));
        }

        let sweep = Sweep::resolve(&experiment, &allocation)?;
        let cases = sweep.cases(&allocation)?;

        let layout = ResultLayout::new(
            result_prefix,
            &cluster.name,
            &benchmark.scenario,
            experiment.kind.name(),
        );

        debug!(
            kind = %experiment.kind,
            nr_cases = cases.len(),
            workspace = %layout.workspace().display(),
            "Planned benchmark"
        );

        Ok(Self {
            cluster,
            benchmark,
            experiment,
            allocation,
            layout,
            sweep,
            cases,
        })
    }

    pub fn kind(&self) -> ExperimentKind {
        self.experiment.kind
    }

    pub fn cases(&self) -> &[BenchmarkCase] {
        &self.cases
    }

    /// Store the settings this plan was built from
    pub fn write_settings(&self, set: &mut PropertySet) -> Result<()> {
        let documents = [
            ("cluster", to_json(&self.cluster)?),
            ("benchmark", to_json(&self.benchmark)?),
            ("experiment", to_json(&self.experiment.settings)?),
            ("kind", self.kind().name().to_string()),
            ("program", self.experiment.program.display().to_string()),
        ];

        for (name, text) in documents {
            set.add_property(name, "")?.write(PropertyValue::Text(text));
        }

        Ok(())
    }

    /// Rebuild a plan from stored settings, with results under `workspace`
    pub fn from_settings(set: &PropertySet, workspace: &Path) -> Result<Self> {
        let cluster: Cluster = from_json(set, "cluster")?;
        let benchmark: Benchmark = from_json(set, "benchmark")?;
        let settings: ExperimentSettings = from_json(set, "experiment")?;
        let kind = ExperimentKind::from_name(set.text("kind")?)?;
        let program = PathBuf::from(set.text("program")?);

        let experiment = Experiment::new(kind, settings, program)?;
        let mut plan = Self::new(cluster, benchmark, experiment, workspace)?;
        plan.layout = ResultLayout::at(workspace);

        Ok(plan)
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| ScaleBenchError::dataset(e.to_string()))
}

fn from_json<T: DeserializeOwned>(set: &PropertySet, name: &str) -> Result<T> {
    serde_json::from_str(set.text(name)?)
        .map_err(|e| ScaleBenchError::dataset(format!("Stored {} settings: {}", name, e)))
}
