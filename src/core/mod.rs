//! Core experiment module
//!
//! Provides benchmark planning and the generate, import and export steps
//! built on top of it.

mod plan;
mod runner;

pub use plan::*;
pub use runner::*;

#[cfg(test)]
pub(crate) use plan::tests;
