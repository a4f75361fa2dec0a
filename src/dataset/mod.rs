//! Dataset persistence
//!
//! Raw results and scaling statistics are stored in JSON datasets. This
//! module provides the store and the names of the property sets the rest
//! of the crate reads and writes.

mod store;

pub use store::*;

/// Settings the experiment was generated with, seeded at generation
pub const SETTINGS_SET: &str = "settings";

/// Constant information about the benchmark, written on first import
pub const META_INFORMATION_SET: &str = "meta_information";

/// One row per imported raw result, in start time order
pub const MEASUREMENT_SET: &str = "measurement";

/// Scaling statistics, one row per measurement row
pub const SCALING_SET: &str = "scaling";

/// Marker property in the meta information set, present once raw results
/// are imported
pub const IMPORTED_MARKER: &str = "raw_results_imported";

/// Name of the property set holding the counters of a run with `nr_workers` workers
pub fn performance_counter_set(nr_workers: u64) -> String {
    format!("performance_counter_{}", nr_workers)
}
