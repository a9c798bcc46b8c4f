//! Compaction planning for a single column.
//!
//! Takes every version timestamp stored for one (row, column), ranks them
//! newest first, evaluates each against the family's rule and splits them
//! into retained and dropped versions.
//!
//! # Example
//!
//! ```rust,ignore
//! use cellgc::gc::{CompactionPlanner, GcRuleEngine};
//!
//! let rule = "maxversions=10 or (maxversions=2 and maxage=5d)".parse()?;
//! let planner = CompactionPlanner::new(GcRuleEngine::new(), rule)?;
//!
//! // Preview what a compaction pass would remove
//! let plan = planner.plan_column(Utc::now(), &versions, true)?;
//! println!("{}", plan.summary());
//! ```

use super::engine::GcRuleEngine;
use crate::models::{CellMetadata, GcRule};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Safely converts Duration to milliseconds as u64, capping at `u64::MAX`.
#[inline]
fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Converts u64 to f64 for metrics, capping at `u32::MAX`.
#[inline]
fn u64_to_f64(value: u64) -> f64 {
    let capped = u32::try_from(value).unwrap_or(u32::MAX);
    f64::from(capped)
}

/// Converts usize to u64 for counters, capping at `u64::MAX`.
#[inline]
fn usize_to_u64(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Result of planning compaction for one column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionPlan {
    /// Versions kept by the rule, newest first.
    pub retained: Vec<DateTime<Utc>>,

    /// Versions matched by the rule, newest first.
    pub dropped: Vec<DateTime<Utc>>,

    /// Number of versions evaluated.
    pub cells_checked: usize,

    /// Whether this plan is only a preview.
    pub dry_run: bool,

    /// Duration of planning in milliseconds.
    pub duration_ms: u64,
}

impl CompactionPlan {
    /// Returns `true` if any version is dropped.
    #[must_use]
    pub fn has_dropped_cells(&self) -> bool {
        !self.dropped.is_empty()
    }

    /// Returns a human-readable summary of the plan.
    #[must_use]
    pub fn summary(&self) -> String {
        let action = if self.dry_run { "would drop" } else { "dropping" };

        if self.dropped.is_empty() {
            format!(
                "No cells matched the gc rule ({} cells checked in {}ms)",
                self.cells_checked, self.duration_ms
            )
        } else {
            format!(
                "{} {} of {} cells, retaining {} ({}ms)",
                action,
                self.dropped.len(),
                self.cells_checked,
                self.retained.len(),
                self.duration_ms
            )
        }
    }
}

/// Plans compaction of columns under one GC rule.
///
/// The rule is validated once in [`CompactionPlanner::new`]; planning then
/// only evaluates. A planner holds no mutable state and can be shared across
/// threads by reference.
#[derive(Debug, Clone)]
pub struct CompactionPlanner {
    engine: GcRuleEngine,
    rule: GcRule,
}

impl CompactionPlanner {
    /// Creates a planner, validating the rule against the engine's limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Structural`] or [`Error::DepthExceeded`] if the rule
    /// is malformed.
    pub fn new(engine: GcRuleEngine, rule: GcRule) -> Result<Self> {
        engine.validate(&rule)?;
        Ok(Self { engine, rule })
    }

    /// Returns the rule this planner applies.
    #[must_use]
    pub const fn rule(&self) -> &GcRule {
        &self.rule
    }

    /// Returns the engine this planner evaluates with.
    #[must_use]
    pub const fn engine(&self) -> &GcRuleEngine {
        &self.engine
    }

    /// Plans compaction of one column.
    ///
    /// `versions` holds the timestamps of every stored version of the column,
    /// in any order. They are ranked newest first (rank 1 is the latest
    /// write) and aged against `reference_time`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if a version is newer than `reference_time`
    ///   or two versions share a timestamp.
    /// - Any evaluation error from [`GcRuleEngine::should_drop`].
    pub fn plan_column(
        &self,
        reference_time: DateTime<Utc>,
        versions: &[DateTime<Utc>],
        dry_run: bool,
    ) -> Result<CompactionPlan> {
        self.plan_column_with_cancel(reference_time, versions, dry_run, &AtomicBool::new(false))
    }

    /// Plans compaction of one column, checking `cancel` between cells.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] once `cancel` is observed set, plus every
    /// error [`CompactionPlanner::plan_column`] can return.
    #[instrument(
        name = "cellgc.gc.plan_column",
        skip(self, versions, cancel),
        fields(
            component = "gc",
            operation = "plan_column",
            versions = versions.len(),
            dry_run = dry_run,
            rule_nodes = self.rule.node_count()
        )
    )]
    pub fn plan_column_with_cancel(
        &self,
        reference_time: DateTime<Utc>,
        versions: &[DateTime<Utc>],
        dry_run: bool,
        cancel: &AtomicBool,
    ) -> Result<CompactionPlan> {
        let start = Instant::now();
        let ranked = rank_versions(reference_time, versions)?;

        let mut plan = CompactionPlan {
            dry_run,
            ..Default::default()
        };

        for (index, timestamp) in ranked.into_iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                debug!(cells_checked = plan.cells_checked, "Compaction plan cancelled");
                return Err(Error::Cancelled);
            }

            let rank = usize_to_u64(index).saturating_add(1);
            let cell = CellMetadata::from_timestamps(reference_time, timestamp, rank);
            plan.cells_checked += 1;

            if self.engine.should_drop(&self.rule, &cell)? {
                debug!(
                    timestamp = %timestamp,
                    rank,
                    age_ms = cell.age.num_milliseconds(),
                    "Cell matched gc rule"
                );
                plan.dropped.push(timestamp);
            } else {
                plan.retained.push(timestamp);
            }
        }

        plan.duration_ms = duration_to_millis(start.elapsed());

        metrics::counter!(
            "gc_compaction_plans_total",
            "dry_run" => dry_run.to_string()
        )
        .increment(1);
        metrics::counter!("gc_cells_checked_total").increment(usize_to_u64(plan.cells_checked));
        metrics::counter!("gc_cells_dropped_total").increment(usize_to_u64(plan.dropped.len()));
        metrics::histogram!("gc_compaction_plan_duration_ms").record(u64_to_f64(plan.duration_ms));

        info!(
            cells_checked = plan.cells_checked,
            cells_dropped = plan.dropped.len(),
            duration_ms = plan.duration_ms,
            dry_run,
            "Compaction plan completed"
        );

        Ok(plan)
    }
}

/// Sorts versions newest first, rejecting future and duplicate timestamps.
fn rank_versions(
    reference_time: DateTime<Utc>,
    versions: &[DateTime<Utc>],
) -> Result<Vec<DateTime<Utc>>> {
    if let Some(future) = versions.iter().find(|ts| **ts > reference_time) {
        return Err(Error::InvalidInput(format!(
            "version {future} is newer than reference time {reference_time}"
        )));
    }

    let mut ranked = versions.to_vec();
    ranked.sort_unstable_by(|a, b| b.cmp(a));

    if let Some(pair) = ranked.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(Error::InvalidInput(format!(
            "duplicate version timestamp {}",
            pair[0]
        )));
    }

    Ok(ranked)
}
