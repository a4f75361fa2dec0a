//! Array and partition shapes
//!
//! Shapes are plain vectors of extents. This module generates the shapes
//! to benchmark from their configuration and checks how partitions tile
//! an array.

mod range;
mod scale;

pub use range::*;
pub use scale::*;

/// Extents of an N-dimensional array or partition
pub type Shape = Vec<u64>;

/// Number of elements in a shape
pub fn nr_elements(shape: &[u64]) -> u64 {
    shape.iter().product()
}

/// Shape as used in file names: `1000x500`
pub fn shape_label(shape: &[u64]) -> String {
    shape
        .iter()
        .map(|extent| extent.to_string())
        .collect::<Vec<_>>()
        .join("x")
}

/// Shape formatted as a list: `[1000, 500]`
pub fn shape_list(shape: &[u64]) -> String {
    let extents: Vec<String> = shape.iter().map(|extent| extent.to_string()).collect();
    format!("[{}]", extents.join(", "))
}
