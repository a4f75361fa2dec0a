//! The steps of an experiment
//!
//! `generate` writes the script and seeds the raw dataset, the program is
//! run outside of this crate, `import` reads its results back and `export`
//! turns the scaling statistics into CSV.

use super::BenchmarkPlan;
use crate::config::{Benchmark, Cluster, Experiment, ExperimentKind, ExperimentSettings, GenerateArgs};
use crate::dataset::{Dataset, SCALING_SET, SETTINGS_SET};
use crate::error::{IoResultExt, Result};
use crate::import::{ImportOutcome, ResultImporter};
use crate::job::{JobScriptBuilder, ResultLayout};
use crate::progress::ProgressReporter;
use crate::stats::{export_csv, ScalingTable};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::info;

/// What `generate` produced
#[derive(Debug, Clone)]
pub struct GenerateSummary {
    pub script: PathBuf,
    pub raw_dataset: PathBuf,
    pub nr_cases: usize,
}

impl GenerateSummary {
    /// Print summary to console
    pub fn print(&self) {
        println!("Script:   {}", self.script.display());
        println!("Dataset:  {}", self.raw_dataset.display());
        println!("Cases:    {}", self.nr_cases);
    }
}

/// Validate all settings, then write the script and the seeded raw dataset
///
/// Nothing is written when any setting is invalid.
pub fn generate(args: &GenerateArgs) -> Result<GenerateSummary> {
    let cluster = Cluster::load(&args.cluster)?;
    let benchmark = Benchmark::load(&args.benchmark)?;
    let settings = ExperimentSettings::load(&args.experiment)?;
    let experiment = Experiment::new(args.kind, settings, args.program.clone())?;

    let plan = BenchmarkPlan::new(cluster, benchmark, experiment, &args.result_prefix)?;
    generate_plan(&plan, &args.script)
}

/// Write the script and the seeded raw dataset of a plan
pub fn generate_plan(plan: &BenchmarkPlan, script_path: &Path) -> Result<GenerateSummary> {
    let script = JobScriptBuilder::new(plan, script_path).build()?;

    let raw_dataset = plan.layout.raw_dataset();
    let mut dataset = Dataset::create(&raw_dataset, &plan.experiment.settings.description)?;
    let set = dataset.add_property_set(SETTINGS_SET, "Settings the experiment was generated with")?;
    plan.write_settings(set)?;
    dataset.save()?;

    if let Some(parent) = script_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_path(parent)?;
    }
    std::fs::write(script_path, script.render()).with_path(script_path)?;
    make_executable(script_path)?;

    info!(
        script = %script_path.display(),
        dataset = %raw_dataset.display(),
        nr_cases = plan.cases().len(),
        "Generated benchmark script"
    );

    Ok(GenerateSummary {
        script: script_path.to_path_buf(),
        raw_dataset,
        nr_cases: plan.cases().len(),
    })
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path).with_path(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    std::fs::set_permissions(path, permissions).with_path(path)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Import the raw results of a workspace
pub fn import(
    workspace: &Path,
    epoch: Option<DateTime<Utc>>,
    progress: ProgressReporter,
) -> Result<ImportOutcome> {
    let mut importer = ResultImporter::new(workspace).with_progress(progress);

    if let Some(epoch) = epoch {
        importer = importer.with_epoch(epoch);
    }

    importer.import()
}

/// Read the scaling statistics of a workspace
pub fn scaling_table(workspace: &Path) -> Result<ScalingTable> {
    let dataset = Dataset::open(&ResultLayout::at(workspace).scaling_dataset())?;
    let kind = ExperimentKind::from_name(dataset.property_set(SETTINGS_SET)?.text("kind")?)?;
    ScalingTable::read(kind, dataset.property_set(SCALING_SET)?)
}

/// Export the scaling statistics of a workspace as CSV
pub fn export(workspace: &Path, output: &Path) -> Result<usize> {
    let table = scaling_table(workspace)?;
    export_csv(&table, output)?;

    info!(output = %output.display(), nr_rows = table.rows.len(), "Exported scaling statistics");
    Ok(table.rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::{experiment_settings, shell_cluster, slurm_cluster};
    use crate::core::tests::{benchmark, plan};
    use crate::error::ScaleBenchError;
    use crate::import::tests::write_raw_result;
    use serde_json::json;

    fn write_json(path: &Path, value: serde_json::Value) {
        std::fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn generate_args(dir: &Path, kind: ExperimentKind) -> GenerateArgs {
        write_json(
            &dir.join("cluster.json"),
            json!({"name": "laptop", "scheduler": {"kind": "shell"}}),
        );
        write_json(
            &dir.join("benchmark.json"),
            json!({
                "scenario": "threads",
                "count": 2,
                "locality_per": "numa_node",
                "worker": {"type": "thread", "pool": {"min_size": 1, "max_size": 4, "multiplier": 2}}
            }),
        );
        write_json(
            &dir.join("experiment.json"),
            json!({
                "nr_time_steps": 10,
                "array": {"shape": [1000, 1000]},
                "partition": {"shape": [100, 100]}
            }),
        );

        GenerateArgs {
            kind,
            cluster: dir.join("cluster.json"),
            benchmark: dir.join("benchmark.json"),
            experiment: dir.join("experiment.json"),
            program: PathBuf::from("/opt/bin/lue_benchmark"),
            script: dir.join("run.sh"),
            result_prefix: dir.join("results"),
        }
    }

    #[test]
    fn test_generate_writes_script_and_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let summary = generate(&generate_args(dir.path(), ExperimentKind::StrongScaling)).unwrap();

        assert_eq!(summary.nr_cases, 3);
        assert_eq!(
            summary.raw_dataset,
            dir.path().join("results/laptop/threads/strong_scaling/raw.json")
        );

        let script = std::fs::read_to_string(&summary.script).unwrap();
        assert!(script.starts_with("#!/usr/bin/env bash\nset -e\n"));
        assert!(script.contains("lue_benchmark"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&summary.script).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }

        let dataset = Dataset::open(&summary.raw_dataset).unwrap();
        assert_eq!(
            dataset.property_set(SETTINGS_SET).unwrap().text("kind").unwrap(),
            "strong_scaling"
        );
    }

    #[test]
    fn test_generate_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let args = generate_args(dir.path(), ExperimentKind::StrongScaling);
        generate(&args).unwrap();

        let err = generate(&args).unwrap_err();
        assert!(matches!(err, ScaleBenchError::DatasetExists(_)));
    }

    #[test]
    fn test_invalid_settings_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = generate_args(dir.path(), ExperimentKind::PartitionShape);
        args.script = dir.path().join("scripts/run.sh");

        // A partition shape experiment cannot sweep worker counts
        assert!(generate(&args).unwrap_err().is_config_error());
        assert!(!args.script.exists());
        assert!(!dir.path().join("results").exists());
    }

    #[test]
    fn test_slurm_script_submits_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let mut plan = plan(
            slurm_cluster(),
            benchmark("cluster_node", json!({"min_size": 1, "max_size": 4, "multiplier": 2})),
            ExperimentKind::StrongScaling,
            experiment_settings(),
        )
        .unwrap();
        plan.layout = ResultLayout::at(dir.path().join("workspace"));

        let summary = generate_plan(&plan, &dir.path().join("submit.sh")).unwrap();
        let script = std::fs::read_to_string(summary.script).unwrap();
        assert_eq!(script.matches("sbatch --job-name").count(), 3);
    }

    #[test]
    fn test_generate_import_export() {
        let dir = tempfile::tempdir().unwrap();
        let summary = generate(&generate_args(dir.path(), ExperimentKind::StrongScaling)).unwrap();
        let workspace = summary.raw_dataset.parent().unwrap().to_path_buf();

        let layout = ResultLayout::at(&workspace);
        for (nr_workers, start, durations) in [
            (1, "2021-03-04T10:00:00Z", [40.0, 44.0]),
            (2, "2021-03-04T10:01:00Z", [20.0, 22.0]),
            (4, "2021-03-04T10:02:00Z", [10.0, 11.0]),
        ] {
            let path = layout.result_file(&[1000, 1000], &[100, 100], nr_workers);
            write_raw_result(&path, start, nr_workers, &[1000, 1000], &[100, 100], &durations);
        }

        let outcome = import(&workspace, None, ProgressReporter::disabled()).unwrap();
        assert_eq!(outcome, ImportOutcome::Imported { nr_results: 3 });

        let output = dir.path().join("scaling.csv");
        assert_eq!(export(&workspace, &output).unwrap(), 3);

        let csv = std::fs::read_to_string(output).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[0].contains("mean_relative_efficiency"));
        assert!(lines[3].starts_with("4,1000x1000,100x100,10.5,"));
    }

    #[test]
    fn test_export_before_import_fails() {
        let dir = tempfile::tempdir().unwrap();
        let plan = {
            let mut plan = plan(
                shell_cluster(),
                benchmark("thread", json!({"min_size": 1, "max_size": 2})),
                ExperimentKind::StrongScaling,
                experiment_settings(),
            )
            .unwrap();
            plan.layout = ResultLayout::at(dir.path());
            plan
        };
        generate_plan(&plan, &dir.path().join("run.sh")).unwrap();

        assert!(export(dir.path(), &dir.path().join("out.csv")).is_err());
    }
}
