//! Mapping of abstract workers onto hardware
//!
//! A worker is a thread, a NUMA node or a cluster node. Given the cluster
//! topology, the worker type and the kind of hardware unit hosting one
//! locality (process), each worker count resolves to a fixed amount of
//! cluster nodes, NUMA nodes, threads and localities.

use super::WorkerRange;
use crate::config::ClusterNode;
use crate::error::{Result, ScaleBenchError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hardware unit a worker corresponds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerType {
    Thread,
    NumaNode,
    ClusterNode,
}

impl WorkerType {
    /// Name as used in configuration and datasets
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thread => "thread",
            Self::NumaNode => "numa_node",
            Self::ClusterNode => "cluster_node",
        }
    }
}

impl fmt::Display for WorkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hardware unit hosting a single locality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalityPer {
    NumaNode,
    ClusterNode,
}

impl LocalityPer {
    /// Name as used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NumaNode => "numa_node",
            Self::ClusterNode => "cluster_node",
        }
    }
}

impl fmt::Display for LocalityPer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed range of counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u64,
    pub max: u64,
}

impl CountRange {
    /// A range holding one value
    pub fn point(value: u64) -> Self {
        Self { min: value, max: value }
    }

    /// Range spanned by a worker pool
    pub fn of(pool: &WorkerRange) -> Self {
        Self {
            min: pool.min_size(),
            max: pool.max_size(),
        }
    }

    /// Distance between the bounds; zero for a degenerate range
    pub fn extent(&self) -> u64 {
        self.max - self.min
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }
}

/// Hardware used by one benchmark run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resources {
    /// Cluster nodes to allocate
    pub nr_cluster_nodes: u64,
    /// NUMA nodes in use on each allocated cluster node
    pub nr_numa_nodes_per_cluster_node: u64,
    /// Processes to start, in total
    pub nr_localities: u64,
    /// OS threads per locality
    pub nr_threads: u64,
    /// Logical cores reserved per locality
    pub nr_logical_cores_per_locality: u64,
}

/// Worker pool resolved against the cluster topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerAllocation {
    pub worker_type: WorkerType,
    pub locality_per: LocalityPer,
    pub pool: WorkerRange,
    pub nr_cluster_nodes: CountRange,
    pub nr_numa_nodes: CountRange,
    pub nr_threads: CountRange,
    nr_numa_nodes_per_cluster_node: u64,
    nr_cores_per_numa_node: u64,
    nr_threads_per_core: u64,
}

impl WorkerAllocation {
    /// Resolve a worker pool against the node topology
    ///
    /// Without a topology only thread workers can be resolved and their
    /// count is not checked against the hardware.
    pub fn resolve(
        worker_type: WorkerType,
        locality_per: LocalityPer,
        pool: WorkerRange,
        node: Option<&ClusterNode>,
    ) -> Result<Self> {
        let unsupported = || ScaleBenchError::UnsupportedWorker {
            worker_type: worker_type.to_string(),
            locality_per: locality_per.to_string(),
        };

        let workers = CountRange::of(&pool);

        let Some(node) = node else {
            if worker_type != WorkerType::Thread {
                return Err(ScaleBenchError::config(format!(
                    "Worker type '{}' requires a cluster node description",
                    worker_type
                )));
            }

            return Ok(Self {
                worker_type,
                locality_per,
                pool,
                nr_cluster_nodes: CountRange::point(1),
                nr_numa_nodes: CountRange::point(1),
                nr_threads: workers,
                nr_numa_nodes_per_cluster_node: 1,
                nr_cores_per_numa_node: workers.max,
                nr_threads_per_core: 1,
            });
        };

        let nr_numa_nodes_per_cluster_node = node.nr_numa_nodes() as u64;
        let nr_cores_per_numa_node = node.nr_cores_per_numa_node() as u64;

        let (nr_cluster_nodes, nr_numa_nodes, nr_threads) = match (worker_type, locality_per) {
            (WorkerType::Thread, LocalityPer::NumaNode) => {
                check_ceiling(workers.max, nr_cores_per_numa_node, "cores in a NUMA node")?;
                (CountRange::point(1), CountRange::point(1), workers)
            }
            (WorkerType::Thread, LocalityPer::ClusterNode) => {
                check_ceiling(workers.max, node.nr_cores() as u64, "cores in a cluster node")?;
                (
                    CountRange::point(1),
                    CountRange::point(nr_numa_nodes_per_cluster_node),
                    workers,
                )
            }
            (WorkerType::NumaNode, LocalityPer::NumaNode) => {
                check_ceiling(
                    workers.max,
                    nr_numa_nodes_per_cluster_node,
                    "NUMA nodes in a cluster node",
                )?;
                (
                    CountRange::point(1),
                    workers,
                    CountRange::point(nr_cores_per_numa_node),
                )
            }
            (WorkerType::ClusterNode, LocalityPer::NumaNode) => (
                workers,
                CountRange::point(nr_numa_nodes_per_cluster_node),
                CountRange::point(nr_cores_per_numa_node),
            ),
            _ => return Err(unsupported()),
        };

        Ok(Self {
            worker_type,
            locality_per,
            pool,
            nr_cluster_nodes,
            nr_numa_nodes,
            nr_threads,
            nr_numa_nodes_per_cluster_node,
            nr_cores_per_numa_node,
            nr_threads_per_core: node.nr_threads_per_core() as u64,
        })
    }

    /// Number of benchmarks, one per worker count
    pub fn nr_benchmarks(&self) -> usize {
        self.pool.nr_permutations()
    }

    /// Worker count of the `idx`-th benchmark
    pub fn nr_workers(&self, idx: usize) -> u64 {
        self.pool.permutation_size(idx)
    }

    /// Number of hardware ranges that vary over the sweep
    pub fn nr_varying_ranges(&self) -> usize {
        [self.nr_cluster_nodes, self.nr_numa_nodes, self.nr_threads]
            .iter()
            .filter(|range| !range.is_degenerate())
            .count()
    }

    /// Whether every benchmark of the sweep fits in one and the same allocation
    pub fn has_fixed_allocation(&self) -> bool {
        self.worker_type == WorkerType::Thread || !self.pool.is_sweep()
    }

    /// Hardware used when running with `nr_workers` workers
    pub fn resources(&self, nr_workers: u64) -> Resources {
        match self.worker_type {
            WorkerType::Thread => Resources {
                nr_cluster_nodes: 1,
                nr_numa_nodes_per_cluster_node: self.nr_numa_nodes.max,
                nr_localities: 1,
                nr_threads: nr_workers,
                nr_logical_cores_per_locality: nr_workers,
            },
            WorkerType::NumaNode => Resources {
                nr_cluster_nodes: 1,
                nr_numa_nodes_per_cluster_node: nr_workers,
                nr_localities: nr_workers,
                nr_threads: self.nr_cores_per_numa_node,
                nr_logical_cores_per_locality: self.nr_cores_per_numa_node
                    * self.nr_threads_per_core,
            },
            WorkerType::ClusterNode => Resources {
                nr_cluster_nodes: nr_workers,
                nr_numa_nodes_per_cluster_node: self.nr_numa_nodes_per_cluster_node,
                nr_localities: nr_workers * self.nr_numa_nodes_per_cluster_node,
                nr_threads: self.nr_cores_per_numa_node,
                nr_logical_cores_per_locality: self.nr_cores_per_numa_node
                    * self.nr_threads_per_core,
            },
        }
    }
}

fn check_ceiling(count: u64, ceiling: u64, what: &str) -> Result<()> {
    if count > ceiling {
        return Err(ScaleBenchError::config(format!(
            "Maximum number of workers ({}) exceeds the number of {} ({})",
            count, what, ceiling
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::slurm_cluster;

    fn node() -> ClusterNode {
        slurm_cluster().node.unwrap()
    }

    #[test]
    fn test_threads_per_numa_node() {
        let pool = WorkerRange::incremented(1, 1, 12).unwrap();
        let allocation =
            WorkerAllocation::resolve(WorkerType::Thread, LocalityPer::NumaNode, pool, Some(&node()))
                .unwrap();

        assert_eq!(allocation.nr_cluster_nodes, CountRange::point(1));
        assert_eq!(allocation.nr_numa_nodes, CountRange::point(1));
        assert_eq!(allocation.nr_threads, CountRange { min: 1, max: 12 });
        assert_eq!(allocation.nr_varying_ranges(), 1);
        assert!(allocation.has_fixed_allocation());

        let resources = allocation.resources(6);
        assert_eq!(resources.nr_localities, 1);
        assert_eq!(resources.nr_threads, 6);
    }

    #[test]
    fn test_threads_exceeding_numa_node() {
        let pool = WorkerRange::incremented(1, 1, 13).unwrap();
        let result =
            WorkerAllocation::resolve(WorkerType::Thread, LocalityPer::NumaNode, pool, Some(&node()));
        assert!(result.unwrap_err().is_config_error());
    }

    #[test]
    fn test_threads_per_cluster_node() {
        let pool = WorkerRange::multiplied(1, 2, 48).unwrap();
        let allocation = WorkerAllocation::resolve(
            WorkerType::Thread,
            LocalityPer::ClusterNode,
            pool,
            Some(&node()),
        )
        .unwrap();

        assert_eq!(allocation.nr_numa_nodes, CountRange::point(4));
        assert_eq!(allocation.nr_threads, CountRange { min: 1, max: 32 });
    }

    #[test]
    fn test_numa_nodes() {
        let pool = WorkerRange::incremented(1, 1, 4).unwrap();
        let allocation = WorkerAllocation::resolve(
            WorkerType::NumaNode,
            LocalityPer::NumaNode,
            pool,
            Some(&node()),
        )
        .unwrap();

        assert_eq!(allocation.nr_numa_nodes, CountRange { min: 1, max: 4 });
        assert_eq!(allocation.nr_threads, CountRange::point(12));
        assert!(!allocation.has_fixed_allocation());

        let resources = allocation.resources(3);
        assert_eq!(resources.nr_cluster_nodes, 1);
        assert_eq!(resources.nr_localities, 3);
        assert_eq!(resources.nr_threads, 12);
        assert_eq!(resources.nr_logical_cores_per_locality, 24);
    }

    #[test]
    fn test_too_many_numa_nodes() {
        let pool = WorkerRange::incremented(1, 1, 5).unwrap();
        assert!(WorkerAllocation::resolve(
            WorkerType::NumaNode,
            LocalityPer::NumaNode,
            pool,
            Some(&node()),
        )
        .is_err());
    }

    #[test]
    fn test_cluster_nodes() {
        let pool = WorkerRange::multiplied(1, 2, 8).unwrap();
        let allocation = WorkerAllocation::resolve(
            WorkerType::ClusterNode,
            LocalityPer::NumaNode,
            pool,
            Some(&node()),
        )
        .unwrap();

        assert_eq!(allocation.nr_cluster_nodes, CountRange { min: 1, max: 8 });
        assert_eq!(allocation.nr_numa_nodes, CountRange::point(4));

        let resources = allocation.resources(8);
        assert_eq!(resources.nr_cluster_nodes, 8);
        assert_eq!(resources.nr_localities, 32);
    }

    #[test]
    fn test_unsupported_combinations() {
        let pool = WorkerRange::incremented(1, 1, 2).unwrap();

        for (worker_type, locality_per) in [
            (WorkerType::NumaNode, LocalityPer::ClusterNode),
            (WorkerType::ClusterNode, LocalityPer::ClusterNode),
        ] {
            let err = WorkerAllocation::resolve(worker_type, locality_per, pool, Some(&node()))
                .unwrap_err();
            assert!(matches!(err, ScaleBenchError::UnsupportedWorker { .. }));
        }
    }

    #[test]
    fn test_without_topology() {
        let pool = WorkerRange::multiplied(1, 2, 8).unwrap();
        let allocation =
            WorkerAllocation::resolve(WorkerType::Thread, LocalityPer::NumaNode, pool, None).unwrap();
        assert_eq!(allocation.nr_threads, CountRange { min: 1, max: 8 });

        assert!(WorkerAllocation::resolve(
            WorkerType::ClusterNode,
            LocalityPer::NumaNode,
            pool,
            None
        )
        .is_err());
    }
}
