//! Progress reporting module
//!
//! Provides progress visualization while raw results are imported.

mod reporter;

pub use reporter::*;
