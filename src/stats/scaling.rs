//! Speed-up, efficiency and throughput
//!
//! Measurements arrive in start time order. Reference runs are therefore
//! looked up by value: the run with one worker, or per array shape the run
//! with the smallest partition shape.

use super::{mean, std_dev};
use crate::config::ExperimentKind;
use crate::dataset::{PropertySet, PropertyValue};
use crate::error::{Result, ScaleBenchError};
use crate::shape::{nr_elements, shape_label, Shape};
use std::collections::BTreeMap;

/// Durations of one benchmark run
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub nr_workers: u64,
    pub array_shape: Shape,
    pub partition_shape: Shape,
    /// One duration per repeat
    pub duration: Vec<f64>,
}

/// How throughput and efficiency follow from durations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingModel {
    /// Same problem, more workers
    Strong { nr_time_steps: u64 },
    /// Problem growing with the number of workers
    Weak {
        nr_time_steps: u64,
        nr_elements_per_worker: u64,
    },
    /// Same problem and workers, different partitioning
    PartitionShape { nr_time_steps: u64 },
}

impl ScalingModel {
    /// Model of an experiment kind
    pub fn new(kind: ExperimentKind, nr_time_steps: u64, nr_elements_per_worker: Option<u64>) -> Result<Self> {
        match kind {
            ExperimentKind::StrongScaling => Ok(Self::Strong { nr_time_steps }),
            ExperimentKind::PartitionShape => Ok(Self::PartitionShape { nr_time_steps }),
            ExperimentKind::WeakScaling => {
                let nr_elements_per_worker = nr_elements_per_worker.ok_or_else(|| {
                    ScaleBenchError::dataset("Weak scaling requires the number of elements per worker")
                })?;
                Ok(Self::Weak {
                    nr_time_steps,
                    nr_elements_per_worker,
                })
            }
        }
    }

    pub fn kind(&self) -> ExperimentKind {
        match self {
            Self::Strong { .. } => ExperimentKind::StrongScaling,
            Self::Weak { .. } => ExperimentKind::WeakScaling,
            Self::PartitionShape { .. } => ExperimentKind::PartitionShape,
        }
    }
}

/// Statistics of one benchmark run, per repeat
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingRow {
    pub nr_workers: u64,
    pub array_shape: Shape,
    pub partition_shape: Shape,
    pub duration: Vec<f64>,
    /// Strong scaling only
    pub relative_speed_up: Option<Vec<f64>>,
    pub relative_efficiency: Vec<f64>,
    pub lups: Vec<f64>,
}

/// Scaling statistics of all runs, in measurement order
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingTable {
    pub kind: ExperimentKind,
    /// Repeats per run
    pub count: usize,
    pub rows: Vec<ScalingRow>,
}

fn divide(numerator: &[f64], denominator: &[f64]) -> Vec<f64> {
    numerator.iter().zip(denominator).map(|(n, d)| n / d).collect()
}

fn reference_of_workers<'a>(measurements: &'a [Measurement]) -> Result<&'a Measurement> {
    measurements
        .iter()
        .find(|measurement| measurement.nr_workers == 1)
        .ok_or_else(|| {
            let nr_workers: Vec<u64> = measurements.iter().map(|m| m.nr_workers).collect();
            ScaleBenchError::MissingReference(format!(
                "no run with 1 worker among {:?}",
                nr_workers
            ))
        })
}

/// Per array shape, the run with the smallest partition shape
fn references_of_partitions(measurements: &[Measurement]) -> BTreeMap<&Shape, &Measurement> {
    let mut references: BTreeMap<&Shape, &Measurement> = BTreeMap::new();

    for measurement in measurements {
        references
            .entry(&measurement.array_shape)
            .and_modify(|reference| {
                let key = (nr_elements(&measurement.partition_shape), &measurement.partition_shape);
                let reference_key = (nr_elements(&reference.partition_shape), &reference.partition_shape);
                if key < reference_key {
                    *reference = measurement;
                }
            })
            .or_insert(measurement);
    }

    references
}

/// Compute scaling statistics of measurements in any order
pub fn compute_scaling(model: ScalingModel, measurements: &[Measurement]) -> Result<ScalingTable> {
    let count = measurements
        .first()
        .map(|measurement| measurement.duration.len())
        .ok_or_else(|| ScaleBenchError::dataset("No measurements to compute scaling statistics of"))?;

    if let Some(measurement) = measurements.iter().find(|m| m.duration.len() != count) {
        return Err(ScaleBenchError::dataset(format!(
            "Run with {} workers holds {} durations instead of {}",
            measurement.nr_workers,
            measurement.duration.len(),
            count
        )));
    }

    let rows: Vec<ScalingRow> = match model {
        ScalingModel::Strong { nr_time_steps } => {
            let reference = reference_of_workers(measurements)?;
            let t1 = &reference.duration;
            let work = (nr_time_steps * nr_elements(&reference.array_shape)) as f64;

            measurements
                .iter()
                .map(|measurement| {
                    let speed_up = divide(t1, &measurement.duration);
                    let efficiency = speed_up
                        .iter()
                        .map(|s| 100.0 * s / measurement.nr_workers as f64)
                        .collect();
                    let lups = measurement.duration.iter().map(|d| work / d).collect();

                    row(measurement, Some(speed_up), efficiency, lups)
                })
                .collect()
        }
        ScalingModel::Weak {
            nr_time_steps,
            nr_elements_per_worker,
        } => {
            let t1 = &reference_of_workers(measurements)?.duration;

            measurements
                .iter()
                .map(|measurement| {
                    let efficiency = divide(t1, &measurement.duration)
                        .into_iter()
                        .map(|ratio| 100.0 * ratio)
                        .collect();
                    let work =
                        (nr_time_steps * measurement.nr_workers * nr_elements_per_worker) as f64;
                    let lups = measurement.duration.iter().map(|d| work / d).collect();

                    row(measurement, None, efficiency, lups)
                })
                .collect()
        }
        ScalingModel::PartitionShape { nr_time_steps } => {
            let references = references_of_partitions(measurements);

            measurements
                .iter()
                .map(|measurement| {
                    let t1 = &references
                        .get(&measurement.array_shape)
                        .ok_or_else(|| {
                            ScaleBenchError::MissingReference(format!(
                                "no partition shape reference for array shape {}",
                                shape_label(&measurement.array_shape)
                            ))
                        })?
                        .duration;
                    let efficiency = divide(t1, &measurement.duration)
                        .into_iter()
                        .map(|ratio| 100.0 * ratio)
                        .collect();
                    let work = (nr_time_steps * nr_elements(&measurement.array_shape)) as f64;
                    let lups = measurement.duration.iter().map(|d| work / d).collect();

                    Ok(row(measurement, None, efficiency, lups))
                })
                .collect::<Result<Vec<_>>>()?
        }
    };

    Ok(ScalingTable {
        kind: model.kind(),
        count,
        rows,
    })
}

fn row(
    measurement: &Measurement,
    relative_speed_up: Option<Vec<f64>>,
    relative_efficiency: Vec<f64>,
    lups: Vec<f64>,
) -> ScalingRow {
    ScalingRow {
        nr_workers: measurement.nr_workers,
        array_shape: measurement.array_shape.clone(),
        partition_shape: measurement.partition_shape.clone(),
        duration: measurement.duration.clone(),
        relative_speed_up,
        relative_efficiency,
        lups,
    }
}

/// Names of the per-repeat series of a table, with their descriptions
fn series_names(kind: ExperimentKind) -> Vec<(&'static str, &'static str)> {
    let mut names = vec![("duration", "Duration of each repeat")];

    if kind == ExperimentKind::StrongScaling {
        names.push(("relative_speed_up", "Relative speed-up: t1 / duration"));
        names.push((
            "relative_efficiency",
            "Relative efficiency: 100% * relative_speed_up / nr_workers",
        ));
    } else {
        names.push(("relative_efficiency", "Relative efficiency: 100% * t1 / duration"));
    }

    names.push(("lups", "Lattice updates per unit of time"));
    names
}

impl ScalingRow {
    /// Per-repeat series by name
    pub fn series(&self, name: &str) -> Option<&[f64]> {
        match name {
            "duration" => Some(&self.duration),
            "relative_speed_up" => self.relative_speed_up.as_deref(),
            "relative_efficiency" => Some(&self.relative_efficiency),
            "lups" => Some(&self.lups),
            _ => None,
        }
    }
}

impl ScalingTable {
    /// Names of the per-repeat series in this table
    pub fn series_names(&self) -> Vec<&'static str> {
        series_names(self.kind).into_iter().map(|(name, _)| name).collect()
    }

    /// Write the table into a property set, one row per run
    ///
    /// With more than one repeat per run, the mean and the standard
    /// deviation of every series are written too.
    pub fn write(&self, set: &mut PropertySet) -> Result<()> {
        let nr_workers = set.add_property("nr_workers", "Number of workers")?;
        for row in &self.rows {
            nr_workers.append(PropertyValue::Integer(row.nr_workers));
        }

        let array_shape = set.add_property("array_shape", "Shape of the array")?;
        for row in &self.rows {
            array_shape.append(PropertyValue::IntegerArray(row.array_shape.clone()));
        }

        let partition_shape = set.add_property("partition_shape", "Shape of the partitions")?;
        for row in &self.rows {
            partition_shape.append(PropertyValue::IntegerArray(row.partition_shape.clone()));
        }

        for (name, description) in series_names(self.kind) {
            let values: Vec<&[f64]> = self
                .rows
                .iter()
                .map(|row| row.series(name).unwrap_or(&[]))
                .collect();

            let property = set.add_property(name, description)?;
            for series in &values {
                property.append(PropertyValue::FloatArray(series.to_vec()));
            }

            if self.count > 1 {
                let property = set.add_property(&format!("mean_{}", name), &format!("Mean of {}", name))?;
                for series in &values {
                    property.append(PropertyValue::Float(mean(series)));
                }

                let property = set.add_property(
                    &format!("std_{}", name),
                    &format!("Population standard deviation of {}", name),
                )?;
                for series in &values {
                    property.append(PropertyValue::Float(std_dev(series)));
                }
            }
        }

        Ok(())
    }

    /// Read a table written by [`ScalingTable::write`]
    pub fn read(kind: ExperimentKind, set: &PropertySet) -> Result<Self> {
        let invalid = |name: &str| ScaleBenchError::dataset(format!("Invalid values in property '{}'", name));

        let nr_workers = set
            .property("nr_workers")?
            .values
            .iter()
            .map(|value| value.as_integer().ok_or_else(|| invalid("nr_workers")))
            .collect::<Result<Vec<_>>>()?;

        let shapes = |name: &str| -> Result<Vec<Shape>> {
            set.property(name)?
                .values
                .iter()
                .map(|value| value.as_integer_array().map(<[u64]>::to_vec).ok_or_else(|| invalid(name)))
                .collect()
        };
        let array_shapes = shapes("array_shape")?;
        let partition_shapes = shapes("partition_shape")?;

        let series = |name: &str| -> Result<Vec<Vec<f64>>> {
            set.property(name)?
                .values
                .iter()
                .map(|value| value.to_float_array().ok_or_else(|| invalid(name)))
                .collect()
        };
        let duration = series("duration")?;
        let relative_speed_up = if kind == ExperimentKind::StrongScaling {
            Some(series("relative_speed_up")?)
        } else {
            None
        };
        let relative_efficiency = series("relative_efficiency")?;
        let lups = series("lups")?;

        let nr_rows = nr_workers.len();
        if [array_shapes.len(), partition_shapes.len(), duration.len(), relative_efficiency.len(), lups.len()]
            .iter()
            .any(|&len| len != nr_rows)
        {
            return Err(ScaleBenchError::dataset("Scaling properties differ in length"));
        }

        let rows = (0..nr_rows)
            .map(|idx| ScalingRow {
                nr_workers: nr_workers[idx],
                array_shape: array_shapes[idx].clone(),
                partition_shape: partition_shapes[idx].clone(),
                duration: duration[idx].clone(),
                relative_speed_up: relative_speed_up
                    .as_ref()
                    .and_then(|values| values.get(idx).cloned()),
                relative_efficiency: relative_efficiency[idx].clone(),
                lups: lups[idx].clone(),
            })
            .collect();

        Ok(Self {
            kind,
            count: duration.first().map(Vec::len).unwrap_or(0),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement(nr_workers: u64, duration: Vec<f64>) -> Measurement {
        Measurement {
            nr_workers,
            array_shape: vec![1000, 1000],
            partition_shape: vec![100, 100],
            duration,
        }
    }

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "{} != {} (±{})",
            actual,
            expected,
            tolerance
        );
    }

    #[test]
    fn test_strong_scaling() {
        let measurements: Vec<Measurement> = [(1, 100.0), (2, 52.0), (4, 27.0), (8, 15.0)]
            .into_iter()
            .map(|(n, d)| measurement(n, vec![d]))
            .collect();

        let table = compute_scaling(ScalingModel::Strong { nr_time_steps: 10 }, &measurements).unwrap();

        let speed_up: Vec<f64> = table
            .rows
            .iter()
            .map(|row| row.relative_speed_up.as_ref().unwrap()[0])
            .collect();
        for (actual, expected) in speed_up.iter().zip([1.0, 1.92, 3.70, 6.67]) {
            assert_close(*actual, expected, 1e-2);
        }

        assert_close(table.rows[3].relative_efficiency[0], 83.33, 1e-2);
        assert_close(table.rows[0].lups[0], 10.0 * 1e6 / 100.0, 1e-9);
        assert_eq!(table.count, 1);
    }

    #[test]
    fn test_reference_located_by_value() {
        // Arrival order differs from worker order
        let measurements = vec![
            measurement(4, vec![27.0]),
            measurement(1, vec![100.0]),
            measurement(8, vec![15.0]),
            measurement(2, vec![52.0]),
        ];

        let table = compute_scaling(ScalingModel::Strong { nr_time_steps: 1 }, &measurements).unwrap();

        assert_eq!(table.rows[1].relative_speed_up.as_ref().unwrap()[0], 1.0);
        assert_close(table.rows[0].relative_speed_up.as_ref().unwrap()[0], 100.0 / 27.0, 1e-12);
    }

    #[test]
    fn test_missing_reference() {
        let measurements = vec![measurement(2, vec![50.0]), measurement(4, vec![25.0])];
        let err = compute_scaling(ScalingModel::Strong { nr_time_steps: 1 }, &measurements).unwrap_err();
        assert!(matches!(err, ScaleBenchError::MissingReference(_)));
    }

    #[test]
    fn test_weak_scaling() {
        let measurements = vec![measurement(1, vec![10.0, 12.0]), measurement(4, vec![20.0, 12.0])];

        let table = compute_scaling(
            ScalingModel::Weak {
                nr_time_steps: 5,
                nr_elements_per_worker: 100,
            },
            &measurements,
        )
        .unwrap();

        assert!(table.rows[0].relative_speed_up.is_none());
        // Element-wise against the reference repeats
        assert_eq!(table.rows[1].relative_efficiency, vec![50.0, 100.0]);
        assert_eq!(table.rows[1].lups, vec![5.0 * 4.0 * 100.0 / 20.0, 5.0 * 4.0 * 100.0 / 12.0]);
        assert_eq!(table.count, 2);
    }

    #[test]
    fn test_partition_shape_reference_per_array() {
        let shaped = |array: Shape, partition: Shape, duration: f64| Measurement {
            nr_workers: 4,
            array_shape: array,
            partition_shape: partition,
            duration: vec![duration],
        };

        let measurements = vec![
            shaped(vec![100], vec![50], 8.0),
            shaped(vec![100], vec![10], 10.0),
            shaped(vec![200], vec![20], 30.0),
            shaped(vec![200], vec![40], 15.0),
        ];

        let table = compute_scaling(ScalingModel::PartitionShape { nr_time_steps: 2 }, &measurements).unwrap();

        assert_eq!(table.rows[0].relative_efficiency, vec![125.0]);
        assert_eq!(table.rows[1].relative_efficiency, vec![100.0]);
        assert_eq!(table.rows[3].relative_efficiency, vec![200.0]);
        assert_eq!(table.rows[2].lups, vec![2.0 * 200.0 / 30.0]);
    }

    #[test]
    fn test_unequal_repeat_counts_rejected() {
        let measurements = vec![measurement(1, vec![1.0, 2.0]), measurement(2, vec![1.0])];
        assert!(compute_scaling(ScalingModel::Strong { nr_time_steps: 1 }, &measurements).is_err());
    }

    #[test]
    fn test_write_and_read_back() {
        let measurements = vec![measurement(1, vec![10.0, 14.0]), measurement(2, vec![6.0, 6.0])];
        let table = compute_scaling(ScalingModel::Strong { nr_time_steps: 1 }, &measurements).unwrap();

        let mut set = PropertySet::default();
        table.write(&mut set).unwrap();

        assert!(set.contains("mean_duration"));
        assert!(set.contains("std_relative_speed_up"));
        assert_eq!(set.property("mean_duration").unwrap().values[0], PropertyValue::Float(12.0));
        assert_eq!(set.property("std_duration").unwrap().values[0], PropertyValue::Float(2.0));

        assert_eq!(ScalingTable::read(ExperimentKind::StrongScaling, &set).unwrap(), table);
    }

    #[test]
    fn test_single_repeat_has_no_summary() {
        let measurements = vec![measurement(1, vec![10.0]), measurement(2, vec![6.0])];
        let table = compute_scaling(
            ScalingModel::Weak {
                nr_time_steps: 1,
                nr_elements_per_worker: 1,
            },
            &measurements,
        )
        .unwrap();

        let mut set = PropertySet::default();
        table.write(&mut set).unwrap();

        assert!(!set.contains("mean_duration"));
        assert!(!set.contains("relative_speed_up"));
        assert!(set.contains("relative_efficiency"));
    }
}
