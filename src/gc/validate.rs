//! Structural validation of rule trees.
//!
//! Run once when a tree is built, parsed or loaded from config. The
//! evaluator itself only checks what it meets on the path it walks.

use crate::models::GcRule;
use crate::{Error, Result};
use chrono::TimeDelta;

/// Validates a rule tree.
///
/// Checks, over the whole tree:
/// - every union and intersection has at least one child
/// - nesting depth does not exceed `max_depth`
/// - max-versions rules keep at least one version
/// - max-age rules are not negative
///
/// The walk uses an explicit stack, so a pathologically deep tree is
/// reported as [`Error::DepthExceeded`] rather than overflowing.
///
/// # Errors
///
/// Returns [`Error::Structural`] or [`Error::DepthExceeded`] describing the
/// first offending rule. Error messages name the rule by its child-index
/// path from the root (for example `root/1/0`).
pub fn validate(rule: &GcRule, max_depth: usize) -> Result<()> {
    let mut stack = vec![(rule, 1_usize, String::from("root"))];

    while let Some((rule, depth, path)) = stack.pop() {
        if depth > max_depth {
            return Err(Error::DepthExceeded {
                depth,
                limit: max_depth,
            });
        }

        match rule {
            GcRule::MaxAge(age) if *age < TimeDelta::zero() => {
                return Err(Error::Structural(format!(
                    "max_age at {path} is negative"
                )));
            },
            GcRule::MaxVersions(0) => {
                return Err(Error::Structural(format!(
                    "max_versions at {path} must keep at least one version"
                )));
            },
            GcRule::MaxAge(_) | GcRule::MaxVersions(_) => {},
            GcRule::Union(children) | GcRule::Intersection(children) => {
                if children.is_empty() {
                    return Err(Error::Structural(format!(
                        "{} at {path} has no child rules",
                        rule.kind()
                    )));
                }
                // Reversed so children pop in declaration order.
                for (i, child) in children.iter().enumerate().rev() {
                    stack.push((child, depth + 1, format!("{path}/{i}")));
                }
            },
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc::DEFAULT_MAX_DEPTH;

    fn chain(depth: usize) -> GcRule {
        let mut rule = GcRule::max_versions(1);
        for _ in 1..depth {
            rule = GcRule::Intersection(vec![rule]);
        }
        rule
    }

    #[test]
    fn test_valid_nested_rule() {
        let rule = GcRule::union([
            GcRule::max_versions(10),
            GcRule::intersection([GcRule::max_versions(2), GcRule::max_age_days(5)]).unwrap(),
        ])
        .unwrap();

        assert!(validate(&rule, DEFAULT_MAX_DEPTH).is_ok());
    }

    #[test]
    fn test_empty_composite_reports_path() {
        let rule = GcRule::Union(vec![
            GcRule::max_versions(1),
            GcRule::Intersection(vec![GcRule::max_age_days(1), GcRule::Union(Vec::new())]),
        ]);

        let err = validate(&rule, DEFAULT_MAX_DEPTH).unwrap_err();
        assert!(matches!(err, Error::Structural(_)));
        assert_eq!(
            err.to_string(),
            "malformed gc rule: union at root/1/1 has no child rules"
        );
    }

    #[test]
    fn test_empty_root_rejected() {
        let err = validate(&GcRule::Intersection(Vec::new()), DEFAULT_MAX_DEPTH).unwrap_err();
        assert!(matches!(err, Error::Structural(_)));
    }

    #[test]
    fn test_zero_max_versions_rejected() {
        let err = validate(&GcRule::max_versions(0), DEFAULT_MAX_DEPTH).unwrap_err();
        assert!(err.to_string().contains("at least one version"));
    }

    #[test]
    fn test_negative_max_age_rejected() {
        let rule = GcRule::max_age(TimeDelta::seconds(-5));
        let err = validate(&rule, DEFAULT_MAX_DEPTH).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn test_depth_at_limit_accepted() {
        assert!(validate(&chain(DEFAULT_MAX_DEPTH), DEFAULT_MAX_DEPTH).is_ok());
    }

    #[test]
    fn test_depth_over_limit_rejected() {
        let err = validate(&chain(DEFAULT_MAX_DEPTH + 1), DEFAULT_MAX_DEPTH).unwrap_err();
        assert!(matches!(
            err,
            Error::DepthExceeded {
                depth: 65,
                limit: 64
            }
        ));
    }

    #[test]
    fn test_very_deep_tree_does_not_overflow() {
        let err = validate(&chain(2_000), DEFAULT_MAX_DEPTH).unwrap_err();
        assert!(matches!(err, Error::DepthExceeded { .. }));
    }
}
