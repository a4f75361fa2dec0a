//! Hardware topology of the local machine
//!
//! Reads packages, NUMA nodes, cores and hardware threads from sysfs and
//! describes them as a cluster node. Without sysfs the logical and physical
//! CPU counts from `num_cpus` are used.

use crate::config::{Cluster, ClusterNode, Core, NumaNode, Package, Scheduler};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Default location of the system topology in sysfs
pub const SYSFS_SYSTEM: &str = "/sys/devices/system";

/// One NUMA node as found in sysfs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumaNodeInfo {
    pub id: usize,
    /// Logical CPUs belonging to this node
    pub cpus: Vec<usize>,
    /// Total memory in bytes, 0 when unknown
    pub memory_total: u64,
}

/// Topology of the local machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTopology {
    pub nr_packages: usize,
    pub nodes: Vec<NumaNodeInfo>,
    /// Distinct physical cores
    pub nr_cores: usize,
    /// Logical CPUs
    pub nr_logical_cpus: usize,
}

impl LocalTopology {
    /// Detect the topology of this machine
    pub fn detect() -> Self {
        Self::detect_at(Path::new(SYSFS_SYSTEM))
    }

    /// Detect the topology from a sysfs tree rooted at `system`
    pub fn detect_at(system: &Path) -> Self {
        let mut nodes = read_nodes(&system.join("node"));

        if nodes.is_empty() {
            let nr_logical_cpus = num_cpus::get();
            debug!("No NUMA information found, assuming a single NUMA node");
            nodes.push(NumaNodeInfo {
                id: 0,
                cpus: (0..nr_logical_cpus).collect(),
                memory_total: 0,
            });
        }

        let cpus: Vec<usize> = nodes.iter().flat_map(|node| node.cpus.iter().copied()).collect();
        let mut packages = BTreeSet::new();
        let mut cores = BTreeSet::new();

        for &cpu in &cpus {
            let topology = system.join("cpu").join(format!("cpu{}", cpu)).join("topology");
            let package = read_number(&topology.join("physical_package_id"));
            let core = read_number(&topology.join("core_id"));

            if let (Some(package), Some(core)) = (package, core) {
                packages.insert(package);
                cores.insert((package, core));
            }
        }

        let (nr_packages, nr_cores) = if cores.is_empty() {
            (1, num_cpus::get_physical().min(cpus.len()).max(1))
        } else {
            (packages.len(), cores.len())
        };

        Self {
            nr_packages,
            nodes,
            nr_cores,
            nr_logical_cpus: cpus.len(),
        }
    }

    /// Describe this machine as a cluster node
    ///
    /// Cluster nodes are uniform, so counts are divided evenly and rounded
    /// down to at least one.
    pub fn to_cluster_node(&self) -> ClusterNode {
        let nr_numa_nodes = self.nodes.len().max(1);
        let nr_numa_nodes_per_package = (nr_numa_nodes / self.nr_packages.max(1)).max(1);
        let nr_cores_per_numa_node = (self.nr_cores / nr_numa_nodes).max(1);
        let nr_threads_per_core = (self.nr_logical_cpus / self.nr_cores.max(1)).max(1);

        let memory = self
            .nodes
            .iter()
            .map(|node| node.memory_total)
            .filter(|&total| total > 0)
            .min()
            .map(|bytes| format!("{}M", bytes / (1024 * 1024)));

        ClusterNode {
            nr_packages: self.nr_packages.max(1),
            package: Package {
                nr_numa_nodes: nr_numa_nodes_per_package,
                numa_node: NumaNode {
                    nr_cores: nr_cores_per_numa_node,
                    memory,
                    core: Core {
                        nr_threads: nr_threads_per_core,
                    },
                },
            },
        }
    }

    /// Print topology summary
    pub fn print_summary(&self) {
        println!("Local topology:");
        println!("  Packages:     {}", self.nr_packages);
        println!("  NUMA nodes:   {}", self.nodes.len());
        println!("  Cores:        {}", self.nr_cores);
        println!("  Logical CPUs: {}", self.nr_logical_cpus);

        for node in &self.nodes {
            if node.memory_total > 0 {
                println!(
                    "  Node {}: {} CPUs, {}",
                    node.id,
                    node.cpus.len(),
                    humansize::format_size(node.memory_total, humansize::BINARY)
                );
            } else {
                println!("  Node {}: {} CPUs", node.id, node.cpus.len());
            }
        }
    }
}

/// Shell cluster configuration describing this machine
pub fn local_cluster(name: Option<String>) -> Cluster {
    let name = name.unwrap_or_else(|| {
        hostname::get()
            .ok()
            .and_then(|host| host.into_string().ok())
            .filter(|host| !host.is_empty())
            .unwrap_or_else(|| "localhost".to_string())
    });

    Cluster {
        name,
        scheduler: Scheduler::Shell,
        node: Some(LocalTopology::detect().to_cluster_node()),
    }
}

fn read_nodes(node_root: &Path) -> Vec<NumaNodeInfo> {
    let mut nodes = Vec::new();

    if let Ok(entries) = std::fs::read_dir(node_root) {
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name();
            let name = name.to_string_lossy();

            let Some(id) = name.strip_prefix("node").and_then(|id| id.parse::<usize>().ok()) else {
                continue;
            };

            let path = entry.path();
            let cpus = std::fs::read_to_string(path.join("cpulist"))
                .map(|content| parse_cpu_list(content.trim()))
                .unwrap_or_default();

            nodes.push(NumaNodeInfo {
                id,
                cpus,
                memory_total: read_node_memory(&path),
            });
        }
    }

    nodes.sort_by_key(|node| node.id);
    nodes
}

fn read_number(path: &Path) -> Option<usize> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn read_node_memory(node_path: &Path) -> u64 {
    std::fs::read_to_string(node_path.join("meminfo"))
        .ok()
        .and_then(|content| {
            content
                .lines()
                .find(|line| line.contains("MemTotal:"))
                // Format: "Node X MemTotal: 12345 kB"
                .and_then(|line| line.split_whitespace().nth(3))
                .and_then(|kb| kb.parse::<u64>().ok())
        })
        .map(|kb| kb * 1024)
        .unwrap_or(0)
}

/// Parse CPU list format (e.g., "0-3,8-11" -> [0,1,2,3,8,9,10,11])
fn parse_cpu_list(s: &str) -> Vec<usize> {
    let mut cpus = Vec::new();

    for part in s.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                if let (Ok(start), Ok(end)) = (start.parse::<usize>(), end.parse::<usize>()) {
                    cpus.extend(start..=end);
                }
            }
            None => {
                if let Ok(cpu) = part.parse::<usize>() {
                    cpus.push(cpu);
                }
            }
        }
    }

    cpus
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Fake sysfs: 2 packages, 1 NUMA node each, 2 cores per node, 2 threads per core
    fn fake_sysfs(root: &Path) {
        for (node, cpulist) in [(0, "0-3"), (1, "4-7")] {
            let path = root.join(format!("node/node{}", node));
            fs::create_dir_all(&path).unwrap();
            fs::write(path.join("cpulist"), format!("{}\n", cpulist)).unwrap();
            fs::write(
                path.join("meminfo"),
                format!("Node {} MemTotal:       16777216 kB\nNode {} MemFree: 1 kB\n", node, node),
            )
            .unwrap();
        }

        for cpu in 0..8 {
            let path = root.join(format!("cpu/cpu{}/topology", cpu));
            fs::create_dir_all(&path).unwrap();
            fs::write(path.join("physical_package_id"), format!("{}\n", cpu / 4)).unwrap();
            fs::write(path.join("core_id"), format!("{}\n", (cpu % 4) / 2)).unwrap();
        }
    }

    #[test]
    fn test_detect_from_sysfs() {
        let dir = tempfile::tempdir().unwrap();
        fake_sysfs(dir.path());

        let topology = LocalTopology::detect_at(dir.path());
        assert_eq!(topology.nr_packages, 2);
        assert_eq!(topology.nodes.len(), 2);
        assert_eq!(topology.nr_cores, 4);
        assert_eq!(topology.nr_logical_cpus, 8);
        assert_eq!(topology.nodes[1].memory_total, 16 * 1024 * 1024 * 1024);

        let node = topology.to_cluster_node();
        assert_eq!(node.nr_numa_nodes(), 2);
        assert_eq!(node.nr_cores_per_numa_node(), 2);
        assert_eq!(node.nr_threads_per_core(), 2);
        assert_eq!(node.numa_node_memory().unwrap(), Some(16 * 1024 * 1024 * 1024));
    }

    #[test]
    fn test_fallback_without_sysfs() {
        let dir = tempfile::tempdir().unwrap();
        let topology = LocalTopology::detect_at(dir.path());

        assert_eq!(topology.nodes.len(), 1);
        assert!(topology.nr_logical_cpus >= 1);
        assert!(topology.nr_cores >= 1);
        assert!(topology.to_cluster_node().nr_threads() >= 1);
    }

    #[test]
    fn test_cpu_list_parsing() {
        assert_eq!(parse_cpu_list("0-3"), vec![0, 1, 2, 3]);
        assert_eq!(parse_cpu_list("0,2,4"), vec![0, 2, 4]);
        assert_eq!(parse_cpu_list("0-2,4-6"), vec![0, 1, 2, 4, 5, 6]);
        assert!(parse_cpu_list("").is_empty());
    }

    #[test]
    fn test_local_cluster_is_valid() {
        let cluster = local_cluster(Some("workstation".to_string()));
        assert_eq!(cluster.name, "workstation");
        assert_eq!(cluster.scheduler, Scheduler::Shell);
        cluster.validate().unwrap();
    }
}
