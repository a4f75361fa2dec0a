//! Generation of shape sequences from configuration

use super::{nr_elements, Shape};
use crate::error::{Result, ScaleBenchError};
use serde::{Deserialize, Serialize};

/// Rounding slack for extents computed through floating point roots
const EXTENT_EPSILON: f64 = 1e-9;

/// How the element count grows between successive shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthMethod {
    /// `size₀ + i·(multiplier − 1)·size₀`
    Linear,
    /// `size₀·multiplierⁱ`
    Exponential,
}

/// Range of shapes sharing the aspect ratio of a base shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub max_nr_elements: u64,
    pub multiplier: f64,
    pub method: GrowthMethod,
}

/// Shape configuration of an array or a partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShapeSpec {
    /// Every combination of extents between two shapes
    Stepped {
        min_shape: Shape,
        max_shape: Shape,
        step: u64,
    },
    /// A single shape, or a range of shapes grown from it
    Shape {
        shape: Shape,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range: Option<RangeSpec>,
    },
}

impl ShapeSpec {
    /// A single fixed shape
    pub fn fixed(shape: Shape) -> Self {
        Self::Shape { shape, range: None }
    }

    /// All shapes described by this configuration
    pub fn shapes(&self) -> Result<Vec<Shape>> {
        match self {
            Self::Stepped {
                min_shape,
                max_shape,
                step,
            } => partition_shapes(min_shape, max_shape, *step),
            Self::Shape { shape, range: None } => {
                check_shape(shape)?;
                Ok(vec![shape.clone()])
            }
            Self::Shape {
                shape,
                range: Some(range),
            } => range_of_shapes(shape, range.max_nr_elements, range.multiplier, range.method),
        }
    }

    /// The shape, when this configuration describes exactly one
    pub fn single(&self) -> Result<Shape> {
        match self {
            Self::Shape { shape, range: None } => {
                check_shape(shape)?;
                Ok(shape.clone())
            }
            _ => Err(ScaleBenchError::config(
                "Expected a single shape, not a range of shapes",
            )),
        }
    }

    /// Rank of the shapes
    pub fn rank(&self) -> usize {
        match self {
            Self::Stepped { min_shape, .. } => min_shape.len(),
            Self::Shape { shape, .. } => shape.len(),
        }
    }
}

fn check_shape(shape: &[u64]) -> Result<()> {
    if shape.is_empty() {
        return Err(ScaleBenchError::config("Shape must have at least one dimension"));
    }

    if shape.contains(&0) {
        return Err(ScaleBenchError::config(format!(
            "Shape extents must be > 0: {:?}",
            shape
        )));
    }

    Ok(())
}

/// Element counts from `size₀` up to and including `max_nr_elements`
fn sizes(size_0: u64, max_nr_elements: u64, multiplier: f64, method: GrowthMethod) -> Vec<f64> {
    let size_0 = size_0 as f64;
    let max_nr_elements = max_nr_elements as f64;
    let mut sizes = Vec::new();

    match method {
        GrowthMethod::Linear => {
            let increment = (multiplier - 1.0) * size_0;
            let mut i = 0u64;

            loop {
                let size = size_0 + i as f64 * increment;
                if size > max_nr_elements {
                    break;
                }
                sizes.push(size);
                i += 1;
            }
        }
        GrowthMethod::Exponential => {
            let mut size = size_0;

            while size <= max_nr_elements {
                sizes.push(size);
                size *= multiplier;
            }
        }
    }

    sizes
}

/// Shapes with the aspect ratio of `min_shape` and growing element counts
///
/// Returns an empty sequence when `min_shape` already holds more than
/// `max_nr_elements` elements. Element counts that floor to the same shape
/// yield that shape once.
pub fn range_of_shapes(
    min_shape: &[u64],
    max_nr_elements: u64,
    multiplier: f64,
    method: GrowthMethod,
) -> Result<Vec<Shape>> {
    check_shape(min_shape)?;

    if !(multiplier > 1.0) {
        return Err(ScaleBenchError::config(format!(
            "Shape range multiplier must be > 1, got {}",
            multiplier
        )));
    }

    let rank = min_shape.len() as f64;
    let max_extent = min_shape.iter().copied().max().unwrap_or(1) as f64;
    let normalized: Vec<f64> = min_shape
        .iter()
        .map(|&extent| extent as f64 / max_extent)
        .collect();

    let mut shapes: Vec<Shape> = sizes(nr_elements(min_shape), max_nr_elements, multiplier, method)
        .into_iter()
        .map(|size| {
            let extent = size.powf(1.0 / rank);
            normalized
                .iter()
                .map(|ratio| (extent * ratio + EXTENT_EPSILON).floor() as u64)
                .collect()
        })
        .collect();
    shapes.dedup();

    Ok(shapes)
}

/// Cartesian product of per-dimension extent ranges
///
/// Each dimension runs from `min_shape[r]` to `max_shape[r]` inclusive, in
/// steps of `step`. The last dimension varies fastest.
pub fn partition_shapes(min_shape: &[u64], max_shape: &[u64], step: u64) -> Result<Vec<Shape>> {
    check_shape(min_shape)?;
    check_shape(max_shape)?;

    if min_shape.len() != max_shape.len() {
        return Err(ScaleBenchError::config(format!(
            "Shapes differ in rank: {:?} and {:?}",
            min_shape, max_shape
        )));
    }

    if step == 0 {
        return Err(ScaleBenchError::config("Shape step must be > 0"));
    }

    if min_shape.iter().zip(max_shape).any(|(min, max)| min > max) {
        return Err(ScaleBenchError::config(format!(
            "Minimum shape {:?} exceeds maximum shape {:?}",
            min_shape, max_shape
        )));
    }

    let mut shapes: Vec<Shape> = vec![Vec::new()];

    for (&min, &max) in min_shape.iter().zip(max_shape) {
        let extents: Vec<u64> = (min..=max).step_by(step as usize).collect();
        shapes = shapes
            .into_iter()
            .flat_map(|prefix| {
                extents.iter().map(move |&extent| {
                    let mut shape = prefix.clone();
                    shape.push(extent);
                    shape
                })
            })
            .collect();
    }

    Ok(shapes)
}
