//! Ranges of worker counts to benchmark

use crate::error::{Result, ScaleBenchError};

/// Sequence of worker counts, in ascending generation order
///
/// Build ranges through the checked constructors. A range with a step that
/// does not grow holds only its first size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerRange {
    /// `min_size, min_size * multiplier, min_size * multiplier², ...` up to `max_size`
    Multiplied {
        min_size: u64,
        multiplier: u64,
        max_size: u64,
    },
    /// `min_size, min_size + incrementor, ...` up to `max_size`
    Incremented {
        min_size: u64,
        incrementor: u64,
        max_size: u64,
    },
    /// A single worker count
    Empty { size: u64 },
}

impl WorkerRange {
    /// Create a multiplied range, `max_size` being the ceiling
    pub fn multiplied(min_size: u64, multiplier: u64, max_size: u64) -> Result<Self> {
        check_bounds(min_size, max_size)?;

        if multiplier <= 1 {
            return Err(ScaleBenchError::config(format!(
                "Worker pool multiplier must be > 1, got {}",
                multiplier
            )));
        }

        Ok(Self::Multiplied {
            min_size,
            multiplier,
            max_size,
        })
    }

    /// Create an incremented range, `max_size` being the ceiling
    pub fn incremented(min_size: u64, incrementor: u64, max_size: u64) -> Result<Self> {
        check_bounds(min_size, max_size)?;

        if incrementor < 1 {
            return Err(ScaleBenchError::config(
                "Worker pool incrementor must be >= 1",
            ));
        }

        Ok(Self::Incremented {
            min_size,
            incrementor,
            max_size,
        })
    }

    /// Create a range holding a single size
    pub fn empty(size: u64) -> Result<Self> {
        if size < 1 {
            return Err(ScaleBenchError::config("Worker pool size must be >= 1"));
        }

        Ok(Self::Empty { size })
    }

    /// Number of worker counts in the sweep
    pub fn nr_permutations(&self) -> usize {
        match *self {
            Self::Multiplied {
                min_size,
                multiplier,
                max_size,
            } => {
                if multiplier <= 1 {
                    return 1;
                }

                let mut count = 0;
                let mut size = min_size;

                while size <= max_size {
                    count += 1;
                    match size.checked_mul(multiplier) {
                        Some(next) => size = next,
                        None => break,
                    }
                }

                count
            }
            Self::Incremented {
                min_size,
                incrementor,
                max_size,
            } => match max_size.checked_sub(min_size) {
                Some(extent) if incrementor > 0 => (extent / incrementor + 1) as usize,
                _ => 1,
            },
            Self::Empty { .. } => 1,
        }
    }

    /// The `idx`-th worker count, 0-based
    pub fn permutation_size(&self, idx: usize) -> u64 {
        debug_assert!(idx < self.nr_permutations(), "{} >= {}", idx, self.nr_permutations());

        match *self {
            Self::Multiplied {
                min_size,
                multiplier,
                ..
            } => min_size * multiplier.pow(idx as u32),
            Self::Incremented {
                min_size,
                incrementor,
                ..
            } => min_size + idx as u64 * incrementor,
            Self::Empty { size } => size,
        }
    }

    /// All worker counts of the sweep
    pub fn sizes(&self) -> Vec<u64> {
        (0..self.nr_permutations())
            .map(|idx| self.permutation_size(idx))
            .collect()
    }

    /// Smallest worker count
    pub fn min_size(&self) -> u64 {
        self.permutation_size(0)
    }

    /// Largest worker count actually generated
    pub fn max_size(&self) -> u64 {
        self.permutation_size(self.nr_permutations() - 1)
    }

    /// Whether the range contains more than one worker count
    pub fn is_sweep(&self) -> bool {
        self.nr_permutations() > 1
    }
}

fn check_bounds(min_size: u64, max_size: u64) -> Result<()> {
    if min_size < 1 {
        return Err(ScaleBenchError::config("Worker pool min_size must be >= 1"));
    }

    if min_size > max_size {
        return Err(ScaleBenchError::config(format!(
            "Worker pool min_size ({}) must be <= max_size ({})",
            min_size, max_size
        )));
    }

    Ok(())
}
