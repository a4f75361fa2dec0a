//! Result import
//!
//! Reads the raw results and performance counters the benchmarked program
//! wrote, stores them in the experiment's raw dataset and derives the
//! scaling dataset from it.

mod counters;
mod importer;
mod raw;

pub use counters::*;
pub use importer::*;
pub use raw::*;

#[cfg(test)]
pub(crate) mod tests {
    pub(crate) use super::raw::tests::write_raw_result;
}
