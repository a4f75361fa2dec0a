//! Import of raw benchmark results into the experiment's datasets

use super::{CounterTable, RawMeasurement};
use crate::config::ExperimentKind;
use crate::core::{BenchmarkCase, BenchmarkPlan, Sweep};
use crate::dataset::{
    performance_counter_set, Dataset, PropertySet, PropertyValue, TimeDomain, IMPORTED_MARKER,
    MEASUREMENT_SET, META_INFORMATION_SET, SCALING_SET, SETTINGS_SET,
};
use crate::error::{Result, ScaleBenchError};
use crate::job::ResultLayout;
use crate::progress::ProgressReporter;
use crate::stats::{compute_scaling, Measurement, ScalingModel, ScalingTable};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What an import did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Raw results were imported and scaling statistics computed
    Imported { nr_results: usize },
    /// The raw dataset already held the results; nothing was written
    AlreadyImported,
}

/// Imports the raw results of one experiment workspace
pub struct ResultImporter {
    layout: ResultLayout,
    epoch: Option<DateTime<Utc>>,
    progress: Option<ProgressReporter>,
}

impl ResultImporter {
    pub fn new(workspace: &Path) -> Self {
        Self {
            layout: ResultLayout::at(workspace),
            epoch: None,
            progress: None,
        }
    }

    /// Use `epoch` as origin of the time points instead of the earliest start
    pub fn with_epoch(mut self, epoch: DateTime<Utc>) -> Self {
        self.epoch = Some(epoch);
        self
    }

    /// Attach a progress reporter
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Import all raw results, then write the scaling dataset
    ///
    /// Every result is read and checked before the raw dataset is touched.
    pub fn import(&self) -> Result<ImportOutcome> {
        let mut dataset = Dataset::open(&self.layout.raw_dataset())?;

        if is_imported(&dataset) {
            info!(dataset = %dataset.path().display(), "Raw results already imported");
            return Ok(ImportOutcome::AlreadyImported);
        }

        let plan = BenchmarkPlan::from_settings(
            dataset.property_set(SETTINGS_SET)?,
            self.layout.workspace(),
        )?;

        let result = self.import_plan(&plan, &mut dataset);

        if let Some(progress) = &self.progress {
            match &result {
                Ok(nr_results) => progress.finish_success(&format!("Imported {} results", nr_results)),
                Err(e) => progress.finish_error(&e.to_string()),
            }
        }

        result.map(|nr_results| ImportOutcome::Imported { nr_results })
    }

    fn import_plan(&self, plan: &BenchmarkPlan, dataset: &mut Dataset) -> Result<usize> {
        let mut measurements = self.read_results(plan)?;
        measurements.sort_by_key(|measurement| measurement.start);

        let epoch = match self.epoch {
            Some(epoch) => epoch,
            // Results are non-empty: every plan holds at least one case
            None => measurements.first().map(|m| m.start).unwrap_or_else(Utc::now),
        };

        let time_points = measurements
            .iter()
            .map(|measurement| measurement.offset_from(&epoch))
            .collect::<Result<Vec<_>>>()?;

        let counters = self.read_counters(plan, &measurements)?;
        let table = scaling_statistics(plan, &measurements)?;

        write_meta_information(dataset, plan, &measurements)?;
        write_measurements(dataset, &measurements, epoch, time_points)?;

        for (nr_workers, counter_table) in &counters {
            let set = dataset.add_property_set(
                &performance_counter_set(*nr_workers),
                &format!("Performance counters of the run with {} workers", nr_workers),
            )?;
            for (name, column) in counter_table.names.iter().zip(&counter_table.columns) {
                set.add_property(name, "")?
                    .write(PropertyValue::FloatArray(column.clone()));
            }
        }

        // The raw dataset carries the import marker, so it is saved last
        let mut scaling = dataset.clone();
        let set = scaling.add_property_set(SCALING_SET, "Scaling statistics, one row per run")?;
        table.write(set)?;
        scaling.save_as(&self.layout.scaling_dataset())?;
        info!(dataset = %self.layout.scaling_dataset().display(), "Wrote scaling statistics");

        dataset.save()?;
        info!(
            dataset = %dataset.path().display(),
            nr_results = measurements.len(),
            "Imported raw results"
        );

        Ok(measurements.len())
    }

    fn read_results(&self, plan: &BenchmarkPlan) -> Result<Vec<RawMeasurement>> {
        let cases = plan.cases();

        if let Some(progress) = &self.progress {
            progress.set_total_files(cases.len() as u64);
            progress.set_status("Reading raw results");
        }

        result_files(&self.layout, cases)?
            .into_iter()
            .map(|path| {
                debug!(path = %path.display(), "Reading raw result");
                let measurement = RawMeasurement::read(&path)?;

                if let Some(progress) = &self.progress {
                    progress.file_read(&path);
                }

                Ok(measurement)
            })
            .collect()
    }

    /// Counter tables of scaling runs, keyed by worker count
    fn read_counters(
        &self,
        plan: &BenchmarkPlan,
        measurements: &[RawMeasurement],
    ) -> Result<Vec<(u64, CounterTable)>> {
        if plan.kind() == ExperimentKind::PartitionShape || plan.benchmark.counters().is_none() {
            return Ok(Vec::new());
        }

        measurements
            .iter()
            .map(|measurement| {
                let path = self.layout.counter_file(
                    &measurement.array_shape,
                    &measurement.partition_shape,
                    measurement.nr_workers,
                );
                Ok((measurement.nr_workers, CounterTable::read(&path)?))
            })
            .collect()
    }
}

/// Result file of each case; two cases never share one
fn result_files(layout: &ResultLayout, cases: &[BenchmarkCase]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();

    cases
        .iter()
        .map(|case| {
            let path = layout.result_file(&case.array_shape, &case.partition_shape, case.nr_workers);
            if !seen.insert(path.clone()) {
                return Err(ScaleBenchError::dataset(format!(
                    "More than one benchmark case writes to '{}'",
                    path.display()
                )));
            }
            Ok(path)
        })
        .collect()
}

fn is_imported(dataset: &Dataset) -> bool {
    dataset
        .property_set(META_INFORMATION_SET)
        .map(|set| set.contains(IMPORTED_MARKER))
        .unwrap_or(false)
}

fn write_text(set: &mut PropertySet, name: &str, description: &str, text: impl Into<String>) -> Result<()> {
    set.add_property(name, description)?
        .write(PropertyValue::Text(text.into()));
    Ok(())
}

fn write_meta_information(
    dataset: &mut Dataset,
    plan: &BenchmarkPlan,
    measurements: &[RawMeasurement],
) -> Result<()> {
    let set = dataset.add_property_set(META_INFORMATION_SET, "Benchmark meta information")?;
    let settings = &plan.experiment.settings;

    write_text(set, "name", "Name of the benchmarked program", plan.experiment.program_name())?;
    write_text(set, "system_name", "Name of the cluster", plan.cluster.name.as_str())?;
    write_text(set, "scenario_name", "Name of the scenario", plan.benchmark.scenario.as_str())?;
    write_text(set, "description", "Description of the experiment", settings.description.as_str())?;
    write_text(set, "kind", "Kind of experiment", plan.kind().name())?;
    write_text(set, "worker_type", "Kind of worker", plan.allocation.worker_type.as_str())?;

    if let Some(unit) = measurements.first().map(|m| m.unit.as_str()) {
        write_text(set, "duration_unit", "Unit of the durations", unit)?;
    }

    set.add_property("nr_time_steps", "Number of time steps")?
        .write(PropertyValue::Integer(settings.nr_time_steps));
    set.add_property("count", "Number of measurements per run")?
        .write(PropertyValue::Integer(plan.benchmark.count as u64));

    match &plan.sweep {
        Sweep::StrongScaling {
            array_shape,
            partition_shape,
        } => {
            set.add_property("array_shape", "Shape of the array")?
                .write(PropertyValue::IntegerArray(array_shape.clone()));
            set.add_property("partition_shape", "Shape of the partitions")?
                .write(PropertyValue::IntegerArray(partition_shape.clone()));
        }
        Sweep::WeakScaling {
            array_shape_per_worker,
            partition_shape,
        } => {
            set.add_property("array_shape_per_worker", "Shape of the array per worker")?
                .write(PropertyValue::IntegerArray(array_shape_per_worker.clone()));
            set.add_property("partition_shape", "Shape of the partitions")?
                .write(PropertyValue::IntegerArray(partition_shape.clone()));
        }
        Sweep::PartitionShape { nr_workers, .. } => {
            set.add_property("nr_workers", "Number of workers")?
                .write(PropertyValue::Integer(*nr_workers));
        }
    }

    set.add_property(IMPORTED_MARKER, "Raw results are imported")?
        .write(PropertyValue::Integer(1));

    Ok(())
}

fn write_measurements(
    dataset: &mut Dataset,
    measurements: &[RawMeasurement],
    epoch: DateTime<Utc>,
    time_points: Vec<u64>,
) -> Result<()> {
    let set = dataset.add_property_set(MEASUREMENT_SET, "One row per benchmark run")?;
    set.time_domain = Some(TimeDomain {
        epoch,
        unit: "second".to_string(),
        time_points,
    });

    let property = set.add_property("duration", "Duration of each repeat")?;
    for measurement in measurements {
        property.append(PropertyValue::FloatArray(measurement.durations.clone()));
    }

    let property = set.add_property("nr_workers", "Number of workers")?;
    for measurement in measurements {
        property.append(PropertyValue::Integer(measurement.nr_workers));
    }

    let property = set.add_property("array_shape", "Shape of the array")?;
    for measurement in measurements {
        property.append(PropertyValue::IntegerArray(measurement.array_shape.clone()));
    }

    let property = set.add_property("partition_shape", "Shape of the partitions")?;
    for measurement in measurements {
        property.append(PropertyValue::IntegerArray(measurement.partition_shape.clone()));
    }

    Ok(())
}

fn scaling_statistics(plan: &BenchmarkPlan, measurements: &[RawMeasurement]) -> Result<ScalingTable> {
    let model = ScalingModel::new(
        plan.kind(),
        plan.experiment.settings.nr_time_steps,
        plan.sweep.nr_elements_per_worker(),
    )?;

    let measurements: Vec<Measurement> = measurements
        .iter()
        .map(|measurement| Measurement {
            nr_workers: measurement.nr_workers,
            array_shape: measurement.array_shape.clone(),
            partition_shape: measurement.partition_shape.clone(),
            duration: measurement.durations.clone(),
        })
        .collect();

    compute_scaling(model, &measurements)
}
