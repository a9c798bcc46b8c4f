//! # cellgc
//!
//! Garbage-collection rule engine for column-family stores.
//!
//! A column family carries a declarative GC policy: a tree of max-age and
//! max-versions predicates combined with union (OR) and intersection (AND).
//! During compaction every stored cell version is checked against that tree
//! and either retained or dropped.
//!
//! ## Features
//!
//! - Pure, stateless evaluator safe to share across compaction threads
//! - Validate-once rule trees with a depth guard against hostile input
//! - Textual policies in `cbt setgcpolicy` form (`maxage=5d or maxversions=2`)
//! - Reference compaction planner that ranks column versions newest-first
//!
//! ## Example
//!
//! ```rust
//! use cellgc::{CellMetadata, GcRule, GcRuleEngine};
//! use chrono::TimeDelta;
//!
//! let rule: GcRule = "maxversions=10 or (maxversions=2 and maxage=5d)".parse()?;
//! let engine = GcRuleEngine::new();
//!
//! let cell = CellMetadata::new(TimeDelta::days(6), 3);
//! assert!(engine.should_drop(&rule, &cell)?);
//!
//! let cell = CellMetadata::new(TimeDelta::days(6), 1);
//! assert!(!engine.should_drop(&rule, &cell)?);
//! # Ok::<(), cellgc::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod gc;
pub mod models;
pub mod observability;
pub mod policy;

pub use config::CellgcConfig;
pub use gc::{
    CompactionPlan, CompactionPlanner, DEFAULT_MAX_DEPTH, GcRuleEngine, should_drop, validate,
};
pub use models::{CellMetadata, GcRule};
pub use policy::{parse_duration, parse_policy, parse_policy_with_limit};

/// Error type for cellgc operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Structural` | Empty union/intersection, zero max-versions, negative max-age |
/// | `InvalidInput` | Negative cell age, zero version rank, malformed durations |
/// | `DepthExceeded` | Rule nesting deeper than the configured limit |
/// | `PolicyParse` | Policy text that does not follow the policy grammar |
/// | `Cancelled` | A compaction plan was cancelled between cells |
/// | `OperationFailed` | Config file I/O or TOML errors, logging init failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The rule tree is malformed.
    ///
    /// Raised when:
    /// - A union or intersection has no children
    /// - A max-versions rule keeps zero versions
    /// - A max-age rule has a negative duration
    ///
    /// Should be caught when the tree is built or parsed; the evaluator still
    /// reports it if it meets an empty composite on the path it walks.
    #[error("malformed gc rule: {0}")]
    Structural(String),

    /// Cell metadata or another caller-supplied value violates its contract.
    ///
    /// Raised when:
    /// - A cell's age is negative
    /// - A cell's version rank is zero
    /// - A column contains a version newer than the reference time
    /// - A duration string cannot be parsed
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The rule tree nests deeper than the engine allows.
    #[error("gc rule depth {depth} exceeds limit of {limit}")]
    DepthExceeded {
        /// Depth at which the limit was crossed.
        depth: usize,
        /// Configured limit.
        limit: usize,
    },

    /// A textual policy could not be parsed.
    #[error("invalid gc policy at offset {position}: {message}")]
    PolicyParse {
        /// Byte offset into the policy text.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// A compaction plan was cancelled by its caller.
    #[error("compaction plan cancelled")]
    Cancelled,

    /// An operation failed.
    ///
    /// Raised when:
    /// - The config file cannot be read or parsed
    /// - Logging is initialized twice or with bad filter directives
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for cellgc operations.
pub type Result<T> = std::result::Result<T, Error>;
