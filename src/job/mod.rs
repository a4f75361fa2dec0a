//! Job script generation
//!
//! Builds the shell script that runs every benchmark case directly, or
//! submits the cases to SLURM as batch jobs.

mod builder;
mod layout;
mod program;
mod script;
mod slurm;

pub use builder::*;
pub use layout::*;
pub use program::*;
pub use script::*;
pub use slurm::*;
