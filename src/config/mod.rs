//! Configuration module for ScaleBench
//!
//! Provides CLI arguments and the three JSON documents describing a
//! benchmark run: the cluster, the benchmark (workers, repeats) and the
//! experiment (shapes, time steps).

mod benchmark;
mod cluster;
mod experiment;
mod settings;

pub use benchmark::*;
pub use cluster::*;
pub use experiment::*;
pub use settings::*;

#[cfg(test)]
pub(crate) mod tests {
    pub(crate) use super::cluster::tests::*;
    pub(crate) use super::experiment::tests::experiment_settings;
}
