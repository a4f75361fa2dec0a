//! Cluster description
//!
//! The cluster document names the machine, selects the job scheduler and,
//! optionally, describes the hardware of one cluster node. All cluster
//! nodes are assumed to be identical.

use crate::error::{read_json, Result, ScaleBenchError};
use crate::job::parse_memory;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cluster settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    /// Name of the cluster, used in result paths
    pub name: String,
    /// Job scheduler used to start benchmarks
    pub scheduler: Scheduler,
    /// Hardware of a single cluster node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<ClusterNode>,
}

/// Job scheduler kind and its settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Scheduler {
    /// Run benchmarks one after the other from a plain shell script
    Shell,
    /// Submit benchmarks to SLURM
    Slurm {
        #[serde(default)]
        settings: SlurmSettings,
    },
}

impl Scheduler {
    /// Get scheduler name
    pub fn name(&self) -> &'static str {
        match self {
            Scheduler::Shell => "shell",
            Scheduler::Slurm { .. } => "slurm",
        }
    }
}

/// SLURM specific settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlurmSettings {
    /// Partition to submit jobs to
    #[serde(default, alias = "partition_name")]
    pub partition: Option<String>,
    /// Extra options passed to sbatch
    #[serde(default)]
    pub sbatch_options: Vec<String>,
    /// Extra options passed to every srun
    #[serde(default)]
    pub srun_options: Vec<String>,
    /// Lines setting up the software environment (module loads, exports)
    #[serde(default)]
    pub environment: Vec<String>,
}

/// One cluster node: a number of identical packages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub nr_packages: usize,
    pub package: Package,
}

/// A package (socket): a number of identical NUMA nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub nr_numa_nodes: usize,
    pub numa_node: NumaNode,
}

/// A NUMA node: a number of identical cores sharing local memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumaNode {
    pub nr_cores: usize,
    /// Amount of local memory, e.g. "96G"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    pub core: Core,
}

/// A physical core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Core {
    /// Hardware threads per core
    pub nr_threads: usize,
}

impl ClusterNode {
    /// Number of NUMA nodes in a cluster node
    pub fn nr_numa_nodes(&self) -> usize {
        self.nr_packages * self.package.nr_numa_nodes
    }

    /// Number of physical cores in a NUMA node
    pub fn nr_cores_per_numa_node(&self) -> usize {
        self.package.numa_node.nr_cores
    }

    /// Number of physical cores in a cluster node
    pub fn nr_cores(&self) -> usize {
        self.nr_numa_nodes() * self.nr_cores_per_numa_node()
    }

    /// Number of hardware threads per core
    pub fn nr_threads_per_core(&self) -> usize {
        self.package.numa_node.core.nr_threads
    }

    /// Number of hardware threads in a cluster node
    pub fn nr_threads(&self) -> usize {
        self.nr_cores() * self.nr_threads_per_core()
    }

    /// Memory local to one NUMA node, in bytes
    pub fn numa_node_memory(&self) -> Result<Option<u64>> {
        match &self.package.numa_node.memory {
            None => Ok(None),
            Some(text) => parse_memory(text)
                .map(Some)
                .ok_or_else(|| ScaleBenchError::config(format!("Invalid NUMA node memory: {}", text))),
        }
    }

    fn validate(&self) -> Result<()> {
        let counts = [
            ("nr_packages", self.nr_packages),
            ("nr_numa_nodes", self.package.nr_numa_nodes),
            ("nr_cores", self.package.numa_node.nr_cores),
            ("nr_threads", self.package.numa_node.core.nr_threads),
        ];

        for (name, count) in counts {
            if count == 0 {
                return Err(ScaleBenchError::config(format!("Cluster node {} must be > 0", name)));
            }
        }

        self.numa_node_memory()?;

        Ok(())
    }
}

impl Cluster {
    /// Load and validate a cluster document
    pub fn load(path: &Path) -> Result<Self> {
        let cluster: Self = read_json(path)?;
        cluster
            .validate()
            .map_err(|e| e.with_context(format!("Cluster settings '{}'", path.display())))?;
        Ok(cluster)
    }

    /// Check invariants not expressed by the types
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ScaleBenchError::config("Cluster name must not be empty"));
        }

        if self.name.contains('/') {
            return Err(ScaleBenchError::config(format!(
                "Cluster name must not contain '/': {}",
                self.name
            )));
        }

        if let Some(node) = &self.node {
            node.validate()?;
        }

        if matches!(self.scheduler, Scheduler::Slurm { .. }) && self.node.is_none() {
            return Err(ScaleBenchError::config(
                "A SLURM cluster requires a node description",
            ));
        }

        Ok(())
    }

    /// SLURM settings, if this cluster uses SLURM
    pub fn slurm_settings(&self) -> Option<&SlurmSettings> {
        match &self.scheduler {
            Scheduler::Slurm { settings } => Some(settings),
            Scheduler::Shell => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two packages, two NUMA nodes each, 12 cores per NUMA node, 2-way SMT
    pub(crate) fn slurm_cluster() -> Cluster {
        serde_json::from_value(serde_json::json!({
            "name": "eejit",
            "scheduler": {
                "kind": "slurm",
                "settings": {
                    "partition": "allq",
                    "sbatch_options": ["--exclusive"],
                    "srun_options": ["--mpi=pmix"],
                    "environment": ["module purge", "module load gcc/10.2.0"]
                }
            },
            "node": {
                "nr_packages": 2,
                "package": {
                    "nr_numa_nodes": 2,
                    "numa_node": {
                        "nr_cores": 12,
                        "memory": "96G",
                        "core": { "nr_threads": 2 }
                    }
                }
            }
        }))
        .unwrap()
    }

    pub(crate) fn shell_cluster() -> Cluster {
        serde_json::from_value(serde_json::json!({
            "name": "laptop",
            "scheduler": { "kind": "shell" }
        }))
        .unwrap()
    }

    #[test]
    fn test_topology_counts() {
        let cluster = slurm_cluster();
        cluster.validate().unwrap();
        let node = cluster.node.as_ref().unwrap();
        assert_eq!(node.nr_numa_nodes(), 4);
        assert_eq!(node.nr_cores_per_numa_node(), 12);
        assert_eq!(node.nr_cores(), 48);
        assert_eq!(node.nr_threads(), 96);
        assert_eq!(node.numa_node_memory().unwrap(), Some(96 * 1024 * 1024 * 1024));
    }

    #[test]
    fn test_scheduler_settings() {
        let cluster = slurm_cluster();
        let settings = cluster.slurm_settings().unwrap();
        assert_eq!(settings.partition.as_deref(), Some("allq"));
        assert_eq!(cluster.scheduler.name(), "slurm");

        let shell = shell_cluster();
        shell.validate().unwrap();
        assert!(shell.slurm_settings().is_none());
        assert!(shell.node.is_none());
    }

    #[test]
    fn test_partition_name_alias() {
        let settings: SlurmSettings =
            serde_json::from_str(r#"{"partition_name": "gpu"}"#).unwrap();
        assert_eq!(settings.partition.as_deref(), Some("gpu"));
        assert!(settings.srun_options.is_empty());
    }

    #[test]
    fn test_slurm_requires_node() {
        let mut cluster = slurm_cluster();
        cluster.node = None;
        assert!(cluster.validate().unwrap_err().is_config_error());
    }

    #[test]
    fn test_zero_cores_rejected() {
        let mut cluster = slurm_cluster();
        cluster.node.as_mut().unwrap().package.numa_node.nr_cores = 0;
        assert!(cluster.validate().is_err());
    }

    #[test]
    fn test_invalid_memory_rejected() {
        let mut cluster = slurm_cluster();
        cluster.node.as_mut().unwrap().package.numa_node.memory = Some("lots".to_string());
        assert!(cluster.validate().is_err());
    }
}
