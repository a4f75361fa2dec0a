//! Assembly of the script that runs or submits all benchmark cases

use super::{BatchScript, Memory, ProgramCommand, ShellScript, SlurmHeader, Statement};
use crate::config::{ExperimentKind, Scheduler, SlurmSettings};
use crate::core::{BenchmarkCase, BenchmarkPlan};
use crate::error::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const DELIMITER: &str = "END_OF_SLURM_SCRIPT";

/// Seconds between two submissions, keeping job start times apart
const SUBMIT_INTERVAL: u64 = 2;

/// Builds the script for a benchmark plan
pub struct JobScriptBuilder<'a> {
    plan: &'a BenchmarkPlan,
    /// Path the script will be written to
    script_path: &'a Path,
}

impl<'a> JobScriptBuilder<'a> {
    pub fn new(plan: &'a BenchmarkPlan, script_path: &'a Path) -> Self {
        Self { plan, script_path }
    }

    /// Build the script for the plan's scheduler
    pub fn build(&self) -> Result<ShellScript> {
        match &self.plan.cluster.scheduler {
            Scheduler::Shell => self.shell(),
            Scheduler::Slurm { settings } => {
                if self.plan.allocation.has_fixed_allocation() {
                    self.slurm_single_job(settings)
                } else {
                    self.slurm_job_per_worker_count(settings)
                }
            }
        }
    }

    fn shell(&self) -> Result<ShellScript> {
        let command = ProgramCommand::new(self.plan);
        let mut script = ShellScript::new();

        for case in self.plan.cases() {
            script.push(Statement::MakeDirectory(self.result_directory(case)));
            script.push(Statement::Command(command.command_line(case)?));
        }

        Ok(script)
    }

    /// One job whose allocation fits every case
    fn slurm_single_job(&self, settings: &SlurmSettings) -> Result<ShellScript> {
        let plan = self.plan;
        let cases = plan.cases();
        let max_nr_workers = cases.iter().map(|case| case.nr_workers).max().unwrap_or(1);

        let output = plan.layout.job_output(self.script_path, None);
        let header = self.header(settings, max_nr_workers, output)?;
        let steps = self.job_steps(cases)?;

        let mut script = self.prologue(cases);
        script.push(Statement::Comment("Submit job to SLURM scheduler".to_string()));
        script.push(Statement::Submit {
            job_name: plan.experiment.job_name(),
            sbatch_options: settings.sbatch_options.clone(),
            delimiter: DELIMITER.to_string(),
            script: BatchScript {
                header,
                environment: settings.environment.clone(),
                steps,
            },
        });

        Ok(script)
    }

    /// One job per worker count, the allocation changing with the count
    fn slurm_job_per_worker_count(&self, settings: &SlurmSettings) -> Result<ShellScript> {
        let plan = self.plan;
        let cases = plan.cases();
        let mut script = self.prologue(cases);

        for (idx, case) in cases.iter().enumerate() {
            if idx > 0 {
                script.push(Statement::Sleep(SUBMIT_INTERVAL));
                script.push(Statement::Blank);
            }

            let output = plan.layout.job_output(self.script_path, Some(case.nr_workers));
            let header = self.header(settings, case.nr_workers, output)?;
            let steps = self.job_steps(std::slice::from_ref(case))?;

            script.push(Statement::Comment(format!(
                "Submit job for {} {} worker(s)",
                case.nr_workers, plan.allocation.worker_type
            )));
            script.push(Statement::Submit {
                job_name: format!("{}-{}", plan.experiment.job_name(), case.nr_workers),
                sbatch_options: settings.sbatch_options.clone(),
                delimiter: format!("{}_{}", DELIMITER, case.nr_workers),
                script: BatchScript {
                    header,
                    environment: settings.environment.clone(),
                    steps,
                },
            });
        }

        Ok(script)
    }

    /// Directories SLURM and the program write to must exist before submission
    fn prologue(&self, cases: &[BenchmarkCase]) -> ShellScript {
        let mut script = ShellScript::new();
        script.push(Statement::Comment(
            "Make sure SLURM can create the output files".to_string(),
        ));
        script.push(Statement::MakeDirectory(self.plan.layout.workspace().to_path_buf()));

        let directories: BTreeSet<PathBuf> =
            cases.iter().map(|case| self.result_directory(case)).collect();
        for directory in directories {
            script.push(Statement::MakeDirectory(directory));
        }

        script.push(Statement::Blank);
        script
    }

    fn job_steps(&self, cases: &[BenchmarkCase]) -> Result<Vec<Statement>> {
        let command = ProgramCommand::new(self.plan);
        cases
            .iter()
            .map(|case| command.command_line(case).map(Statement::Command))
            .collect()
    }

    fn header(&self, settings: &SlurmSettings, nr_workers: u64, output: PathBuf) -> Result<SlurmHeader> {
        let plan = self.plan;
        let resources = plan.allocation.resources(nr_workers);

        let memory = if plan.kind() == ExperimentKind::WeakScaling {
            let numa_node_memory = match &plan.cluster.node {
                Some(node) => node.numa_node_memory()?,
                None => None,
            };
            Memory::Local {
                bytes: numa_node_memory
                    .map(|bytes| bytes * resources.nr_numa_nodes_per_cluster_node),
            }
        } else {
            Memory::FullNode
        };

        let time = plan
            .experiment
            .settings
            .max_duration
            .as_ref()
            .map(|duration| duration.to_slurm_time())
            .transpose()?;

        Ok(SlurmHeader {
            nodes: resources.nr_cluster_nodes,
            ntasks: resources.nr_localities,
            cpus_per_task: resources.nr_logical_cores_per_locality,
            output,
            partition: settings.partition.clone(),
            time,
            memory,
        })
    }

    fn result_directory(&self, case: &BenchmarkCase) -> PathBuf {
        self.plan
            .layout
            .result_directory(&case.array_shape, &case.partition_shape)
    }
}
