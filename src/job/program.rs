//! Command line of the benchmarked program
//!
//! Shell and SLURM scripts start the program with the same flags, built
//! here. Only the launcher in front of it differs.

use super::shell_quote;
use crate::config::{ExperimentKind, Scheduler};
use crate::core::{BenchmarkCase, BenchmarkPlan};
use crate::error::Result;
use crate::shape::shape_list;
use crate::worker::Resources;

/// Builds the command starting one benchmark run
pub struct ProgramCommand<'a> {
    plan: &'a BenchmarkPlan,
}

impl<'a> ProgramCommand<'a> {
    pub fn new(plan: &'a BenchmarkPlan) -> Self {
        Self { plan }
    }

    fn ini(&self, key: &str, value: impl std::fmt::Display) -> String {
        format!(
            "--hpx:ini=\"application.{}.{}!={}\"",
            self.plan.experiment.program_name(),
            key,
            value
        )
    }

    /// Flags passed to the program for one benchmark case
    pub fn flags(&self, case: &BenchmarkCase, resources: &Resources) -> Result<Vec<String>> {
        let plan = self.plan;
        let settings = &plan.experiment.settings;
        let mut flags = Vec::new();

        if matches!(plan.cluster.scheduler, Scheduler::Slurm { .. }) {
            flags.push("--hpx:ini=\"hpx.parcel.mpi.enable=1\"".to_string());
        }

        flags.push(format!("--hpx:ini=\"hpx.os_threads={}\"", resources.nr_threads));

        if plan.kind() == ExperimentKind::WeakScaling {
            // OS threads on the first processing unit of each core
            let last = resources.nr_threads.saturating_sub(1);
            flags.push(format!(
                "--hpx:bind=\"thread:0-{}=core:0-{}.pu:0\"",
                last, last
            ));
        }

        let result_file =
            plan.layout
                .result_file(&case.array_shape, &case.partition_shape, case.nr_workers);

        flags.push(self.ini("benchmark.cluster_name", &plan.cluster.name));
        flags.push(self.ini("benchmark.count", plan.benchmark.count));
        flags.push(self.ini("benchmark.nr_workers", case.nr_workers));
        flags.push(self.ini("benchmark.output", result_file.display()));
        flags.push(self.ini("nr_time_steps", settings.nr_time_steps));
        flags.push(self.ini("array_shape", shape_list(&case.array_shape)));
        flags.push(self.ini("partition_shape", shape_list(&case.partition_shape)));

        if let Some(max_tree_depth) = settings.max_tree_depth {
            flags.push(self.ini("benchmark.max_tree_depth", max_tree_depth));
        }

        if let Some(hpx) = plan.benchmark.counters() {
            let counter_file =
                plan.layout
                    .counter_file(&case.array_shape, &case.partition_shape, case.nr_workers);
            flags.push("--hpx:print-counter-format=csv".to_string());
            flags.push(format!(
                "--hpx:print-counter-destination=\"{}\"",
                counter_file.display()
            ));
            flags.extend(hpx.counter_arguments()?);
        }

        Ok(flags)
    }

    /// Full command line, including the launcher
    pub fn command_line(&self, case: &BenchmarkCase) -> Result<String> {
        let plan = self.plan;
        let resources = plan.allocation.resources(case.nr_workers);
        let mut words = Vec::new();

        if let Some(slurm) = plan.cluster.slurm_settings() {
            words.push("srun".to_string());
            words.push(format!("--ntasks {}", resources.nr_localities));
            words.extend(slurm.srun_options.iter().cloned());
        }

        words.push(shell_quote(&plan.experiment.program.display().to_string()));
        words.extend(self.flags(case, &resources)?);

        Ok(words.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::{experiment_settings, shell_cluster, slurm_cluster};
    use crate::core::tests::{benchmark, plan};
    use serde_json::json;

    #[test]
    fn test_shell_command_line() {
        let plan = plan(
            shell_cluster(),
            benchmark("thread", json!({"min_size": 1, "max_size": 2})),
            ExperimentKind::StrongScaling,
            experiment_settings(),
        )
        .unwrap();

        let command = ProgramCommand::new(&plan)
            .command_line(&plan.cases()[1])
            .unwrap();

        assert!(command.starts_with("/opt/bin/lue_benchmark --hpx:ini=\"hpx.os_threads=2\" "));
        assert!(command.contains(
            "--hpx:ini=\"application.lue_benchmark.benchmark.output!=/results/laptop/default/strong_scaling/1000x1000/100x100/2.json\""
        ));
        assert!(command.contains("--hpx:ini=\"application.lue_benchmark.array_shape!=[1000, 1000]\""));
        assert!(command.contains("--hpx:ini=\"application.lue_benchmark.benchmark.max_tree_depth!=10\""));
        assert!(!command.contains("srun"));
        assert!(!command.contains("mpi.enable"));
    }

    #[test]
    fn test_program_path_with_whitespace_quoted() {
        let mut plan = plan(
            shell_cluster(),
            benchmark("thread", json!({"min_size": 1, "max_size": 2})),
            ExperimentKind::StrongScaling,
            experiment_settings(),
        )
        .unwrap();
        plan.experiment.program = std::path::PathBuf::from("/opt/my tools/lue_benchmark");

        let command = ProgramCommand::new(&plan)
            .command_line(&plan.cases()[0])
            .unwrap();
        assert!(command.starts_with("'/opt/my tools/lue_benchmark' --hpx:ini="));
    }

    #[test]
    fn test_slurm_weak_scaling_command_line() {
        let plan = plan(
            slurm_cluster(),
            benchmark("numa_node", json!({"min_size": 1, "max_size": 4})),
            ExperimentKind::WeakScaling,
            experiment_settings(),
        )
        .unwrap();

        let command = ProgramCommand::new(&plan)
            .command_line(&plan.cases()[3])
            .unwrap();

        assert!(command.starts_with(
            "srun --ntasks 4 --mpi=pmix /opt/bin/lue_benchmark --hpx:ini=\"hpx.parcel.mpi.enable=1\" --hpx:ini=\"hpx.os_threads=12\""
        ));
        assert!(command.contains("--hpx:bind=\"thread:0-11=core:0-11.pu:0\""));
        assert!(command.contains("application.lue_benchmark.benchmark.nr_workers!=4"));
        assert!(command.contains("array_shape!=[2000, 2000]"));
    }

    #[test]
    fn test_counter_flags() {
        let mut benchmark = benchmark("thread", json!({"min_size": 1, "max_size": 2}));
        benchmark.hpx = Some(
            serde_json::from_value(json!({
                "performance_counters": [{"print-counter": "/threads/idle-rate"}]
            }))
            .unwrap(),
        );

        let plan = plan(
            shell_cluster(),
            benchmark,
            ExperimentKind::StrongScaling,
            experiment_settings(),
        )
        .unwrap();

        let command = ProgramCommand::new(&plan)
            .command_line(&plan.cases()[0])
            .unwrap();

        assert!(command.contains("--hpx:print-counter-format=csv"));
        assert!(command.contains(
            "--hpx:print-counter-destination=\"/results/laptop/default/strong_scaling/1000x1000/100x100/counter-1.csv\""
        ));
        assert!(command.ends_with("--hpx:print-counter=\"/threads/idle-rate\""));
    }
}
