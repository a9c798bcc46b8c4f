//! Garbage collection module.
//!
//! This module decides which cell versions of a column family are dropped
//! during compaction, given the family's GC rule tree.
//!
//! # Overview
//!
//! - [`validate`] checks a rule tree once, when it is built or parsed.
//! - [`GcRuleEngine`] evaluates a rule against one cell's metadata.
//! - [`CompactionPlanner`] ranks every version of a column, evaluates each
//!   one and produces a [`CompactionPlan`].
//!
//! # Example
//!
//! ```rust
//! use cellgc::gc::{CompactionPlanner, GcRuleEngine};
//! use cellgc::GcRule;
//! use chrono::{TimeDelta, Utc};
//!
//! let rule = GcRule::intersection([GcRule::max_versions(2), GcRule::max_age_days(5)])?;
//! let planner = CompactionPlanner::new(GcRuleEngine::new(), rule)?;
//!
//! let now = Utc::now();
//! let versions = [now, now - TimeDelta::days(6), now - TimeDelta::days(7)];
//! let plan = planner.plan_column(now, &versions, true)?;
//! assert_eq!(plan.dropped, vec![now - TimeDelta::days(7)]);
//! # Ok::<(), cellgc::Error>(())
//! ```
//!
//! # Concurrency
//!
//! Rule trees are immutable and the engine keeps no state between calls, so
//! one tree can be evaluated from many threads at once without locking.

mod engine;
mod planner;
mod validate;

pub use engine::{DEFAULT_MAX_DEPTH, GcRuleEngine, should_drop};
pub use planner::{CompactionPlan, CompactionPlanner};
pub use validate::validate;
