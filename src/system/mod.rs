//! Local system detection
//!
//! Describes the hardware of the machine this runs on, as a starting point
//! for a cluster configuration.

mod numa;

pub use numa::*;
