//! Per-cell retention metadata.

use crate::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};

/// Retention metadata for one cell version, as seen at a reference time.
///
/// Both fields are computed by the caller: `age` is the reference time minus
/// the cell timestamp, and `version_rank` is the cell's 1-based position
/// among all versions of the same (row, column), newest first.
///
/// Out-of-contract values (negative age, rank zero) are representable so the
/// engine can reject them instead of silently normalizing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellMetadata {
    /// Age of the cell at the reference time.
    pub age: TimeDelta,
    /// 1-based rank among versions of the same column (1 = newest).
    pub version_rank: u64,
}

impl CellMetadata {
    /// Creates cell metadata from a precomputed age and rank.
    #[must_use]
    pub const fn new(age: TimeDelta, version_rank: u64) -> Self {
        Self { age, version_rank }
    }

    /// Creates cell metadata from the reference time and the cell timestamp.
    #[must_use]
    pub fn from_timestamps(
        reference_time: DateTime<Utc>,
        cell_time: DateTime<Utc>,
        version_rank: u64,
    ) -> Self {
        Self {
            age: reference_time.signed_duration_since(cell_time),
            version_rank,
        }
    }

    /// Checks the metadata contract.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the age is negative or the rank is
    /// zero.
    pub fn validate(&self) -> Result<()> {
        if self.age < TimeDelta::zero() {
            return Err(Error::InvalidInput(format!(
                "cell age must not be negative (got {}ms)",
                self.age.num_milliseconds()
            )));
        }
        if self.version_rank == 0 {
            return Err(Error::InvalidInput(
                "cell version rank must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
