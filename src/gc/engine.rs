//! GC rule evaluation.
//!
//! Evaluation is a single recursive function that dispatches on the rule
//! variant. Unions stop at the first matching child and intersections at
//! the first non-matching one, in declaration order.

use super::validate::validate;
use crate::config::CellgcConfig;
use crate::models::{CellMetadata, GcRule};
use crate::{Error, Result};

/// Default nesting limit for rule trees.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Evaluates GC rules against cell metadata.
///
/// The engine holds only its settings. It is `Copy`, keeps no state between
/// calls and never mutates the rule, so one engine and one rule tree can be
/// shared by any number of compaction threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcRuleEngine {
    /// Maximum rule nesting depth before evaluation fails.
    max_depth: usize,

    /// Run the full validation pass before every evaluation.
    validate_on_evaluate: bool,
}

impl Default for GcRuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GcRuleEngine {
    /// Creates an engine with the default depth limit and no per-call
    /// validation.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            validate_on_evaluate: false,
        }
    }

    /// Creates an engine from loaded configuration.
    #[must_use]
    pub const fn from_config(config: &CellgcConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            validate_on_evaluate: config.validate_on_evaluate,
        }
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enables or disables validation of the whole tree on every call.
    #[must_use]
    pub const fn with_validate_on_evaluate(mut self, enabled: bool) -> Self {
        self.validate_on_evaluate = enabled;
        self
    }

    /// Returns the maximum nesting depth.
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Returns whether every evaluation re-validates the tree.
    #[must_use]
    pub const fn validate_on_evaluate(&self) -> bool {
        self.validate_on_evaluate
    }

    /// Validates a rule tree against this engine's depth limit.
    ///
    /// # Errors
    ///
    /// See [`validate`].
    pub fn validate(&self, rule: &GcRule) -> Result<()> {
        validate(rule, self.max_depth)
    }

    /// Decides whether a cell should be dropped.
    ///
    /// Returns `true` when the cell matches the rule (drop it) and `false`
    /// when this rule retains it.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if the cell has a negative age or rank zero.
    /// - [`Error::Structural`] if an empty composite is reached.
    /// - [`Error::DepthExceeded`] if evaluation descends past the depth limit.
    ///
    /// With `validate_on_evaluate` the whole tree is checked first, so errors
    /// in branches that short-circuiting would skip are reported too.
    pub fn should_drop(&self, rule: &GcRule, cell: &CellMetadata) -> Result<bool> {
        cell.validate()?;
        if self.validate_on_evaluate {
            self.validate(rule)?;
        }
        self.matches(rule, cell, 1)
    }

    fn matches(&self, rule: &GcRule, cell: &CellMetadata, depth: usize) -> Result<bool> {
        if depth > self.max_depth {
            return Err(Error::DepthExceeded {
                depth,
                limit: self.max_depth,
            });
        }

        match rule {
            GcRule::MaxAge(max_age) => Ok(cell.age > *max_age),
            GcRule::MaxVersions(n) => Ok(cell.version_rank > u64::from(*n)),
            GcRule::Union(children) => {
                ensure_children(rule, children)?;
                for child in children {
                    if self.matches(child, cell, depth + 1)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            },
            GcRule::Intersection(children) => {
                ensure_children(rule, children)?;
                for child in children {
                    if !self.matches(child, cell, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            },
        }
    }
}

fn ensure_children(rule: &GcRule, children: &[GcRule]) -> Result<()> {
    if children.is_empty() {
        return Err(Error::Structural(format!(
            "{} has no child rules",
            rule.kind()
        )));
    }
    Ok(())
}

/// Decides whether a cell should be dropped, using a default engine.
///
/// # Errors
///
/// See [`GcRuleEngine::should_drop`].
pub fn should_drop(rule: &GcRule, cell: &CellMetadata) -> Result<bool> {
    GcRuleEngine::new().should_drop(rule, cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn cell(age_days: i64, rank: u64) -> CellMetadata {
        CellMetadata::new(TimeDelta::days(age_days), rank)
    }

    #[test]
    fn test_max_age_boundary() {
        let rule = GcRule::max_age_days(5);
        assert!(!should_drop(&rule, &cell(5, 1)).unwrap());
        assert!(
            should_drop(
                &rule,
                &CellMetadata::new(TimeDelta::days(5) + TimeDelta::nanoseconds(1), 1)
            )
            .unwrap()
        );
    }

    #[test]
    fn test_max_versions_boundary() {
        let rule = GcRule::max_versions(3);
        assert!(!should_drop(&rule, &cell(0, 3)).unwrap());
        assert!(should_drop(&rule, &cell(0, 4)).unwrap());
    }

    #[test]
    fn test_union_short_circuits_before_empty_child() {
        // The malformed second child is never reached.
        let rule = GcRule::Union(vec![GcRule::max_versions(1), GcRule::Union(Vec::new())]);
        assert!(should_drop(&rule, &cell(0, 2)).unwrap());

        let err = should_drop(&rule, &cell(0, 1)).unwrap_err();
        assert!(matches!(err, Error::Structural(_)));
    }

    #[test]
    fn test_intersection_short_circuits_before_empty_child() {
        let rule = GcRule::Intersection(vec![
            GcRule::max_versions(5),
            GcRule::Intersection(Vec::new()),
        ]);
        assert!(!should_drop(&rule, &cell(0, 1)).unwrap());
    }

    #[test]
    fn test_validate_on_evaluate_reports_skipped_branch() {
        let rule = GcRule::Union(vec![GcRule::max_versions(1), GcRule::Union(Vec::new())]);
        let engine = GcRuleEngine::new().with_validate_on_evaluate(true);

        let err = engine.should_drop(&rule, &cell(0, 2)).unwrap_err();
        assert!(matches!(err, Error::Structural(_)));
    }

    #[test]
    fn test_empty_root_is_structural_error() {
        let err = should_drop(&GcRule::Union(Vec::new()), &cell(1, 1)).unwrap_err();
        assert!(matches!(err, Error::Structural(_)));
    }

    #[test]
    fn test_depth_limit() {
        let mut rule = GcRule::max_versions(1);
        for _ in 0..4 {
            rule = GcRule::Union(vec![rule]);
        }
        assert_eq!(rule.depth(), 5);

        let engine = GcRuleEngine::new().with_max_depth(5);
        assert!(engine.should_drop(&rule, &cell(0, 2)).unwrap());

        let engine = GcRuleEngine::new().with_max_depth(4);
        let err = engine.should_drop(&rule, &cell(0, 2)).unwrap_err();
        assert!(matches!(err, Error::DepthExceeded { depth: 5, limit: 4 }));
    }

    #[test]
    fn test_invalid_cell_checked_before_rule() {
        let err = should_drop(&GcRule::Union(Vec::new()), &cell(0, 0)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_from_config() {
        let config = CellgcConfig::new()
            .with_max_depth(8)
            .with_validate_on_evaluate(true);
        let engine = GcRuleEngine::from_config(&config);
        assert_eq!(engine.max_depth(), 8);
        assert!(engine.validate_on_evaluate());
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GcRuleEngine>();
        assert_send_sync::<GcRule>();
        assert_send_sync::<CellMetadata>();
    }
}
