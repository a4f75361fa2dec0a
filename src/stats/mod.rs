//! Scaling statistics
//!
//! Derives speed-up, efficiency and throughput from imported measurements
//! and exports them as CSV.

mod export;
mod scaling;
mod summary;

pub use export::*;
pub use scaling::*;
pub use summary::*;
