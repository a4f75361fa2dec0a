//! Relations between array shapes, partition shapes and worker counts

use super::{nr_elements, Shape};
use crate::error::{Result, ScaleBenchError};

/// Largest accepted relative difference between the scaled and the
/// requested number of elements
const MAX_WORK_SIZE_DELTA: f64 = 1e-3;

/// Number of partitions along each dimension of `shape`
///
/// Every extent of `shape` must be a whole multiple of the matching
/// extent of `partition_shape`.
pub fn partition_shape_multipliers(shape: &[u64], partition_shape: &[u64]) -> Result<Shape> {
    if shape.len() != partition_shape.len() {
        return Err(ScaleBenchError::config(format!(
            "Array shape {:?} and partition shape {:?} differ in rank",
            shape, partition_shape
        )));
    }

    if shape.contains(&0) || partition_shape.contains(&0) {
        return Err(ScaleBenchError::config(format!(
            "Shape extents must be > 0: {:?}, {:?}",
            shape, partition_shape
        )));
    }

    shape
        .iter()
        .zip(partition_shape)
        .map(|(&extent, &partition_extent)| {
            if extent % partition_extent != 0 {
                Err(ScaleBenchError::config(format!(
                    "Partition shape {:?} does not divide array shape {:?}",
                    partition_shape, shape
                )))
            } else {
                Ok(extent / partition_extent)
            }
        })
        .collect()
}

/// Array shape holding `nr_workers` times the work of `shape_per_worker`
///
/// Each extent is multiplied by `nr_workers^(1/rank)` and rounded. The
/// resulting element count must be within 0.1% of the requested one.
pub fn scale_array_shape(shape_per_worker: &[u64], nr_workers: u64) -> Result<Shape> {
    if shape_per_worker.is_empty() || nr_workers == 0 {
        return Err(ScaleBenchError::config(
            "Cannot scale an empty shape or to zero workers",
        ));
    }

    let rank = shape_per_worker.len() as f64;
    let multiplier = (nr_workers as f64).powf(1.0 / rank);

    let shape: Shape = shape_per_worker
        .iter()
        .map(|&extent| (multiplier * extent as f64).round() as u64)
        .collect();

    let wanted = (nr_workers * nr_elements(shape_per_worker)) as f64;
    let delta = (nr_elements(&shape) as f64 - wanted).abs() / wanted;

    if delta >= MAX_WORK_SIZE_DELTA {
        return Err(ScaleBenchError::config(format!(
            "Cannot scale shape {:?} to {} workers: resulting shape {:?} is off by {:.4}%",
            shape_per_worker,
            nr_workers,
            shape,
            delta * 100.0
        )));
    }

    Ok(shape)
}
