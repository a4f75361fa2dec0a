//! Worker counts and their hardware allocation
//!
//! Provides the sweep of worker counts to benchmark and the mapping of
//! those counts onto cluster nodes, NUMA nodes and threads.

mod pool;
mod range;

pub use pool::*;
pub use range::*;
