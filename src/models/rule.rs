//! GC rule trees.

use crate::{Error, Result};
use chrono::TimeDelta;
use std::fmt;

/// A garbage-collection rule for a column family.
///
/// A rule *matches* a cell when the cell should be dropped. Leaves test one
/// property of the cell; composites combine their children.
///
/// Ownership is strictly tree-shaped: every child is owned by exactly one
/// parent, so a rule can never contain itself. Use [`GcRule::union`] and
/// [`GcRule::intersection`] to build composites; they reject empty child
/// lists up front.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GcRule {
    /// Matches cells older than the given age. A cell exactly at the
    /// boundary is retained.
    MaxAge(TimeDelta),
    /// Matches cells ranked beyond the `n` most recent versions.
    MaxVersions(u32),
    /// Matches when any child matches.
    Union(Vec<GcRule>),
    /// Matches when every child matches.
    Intersection(Vec<GcRule>),
}

impl GcRule {
    /// Creates a max-age rule.
    #[must_use]
    pub const fn max_age(age: TimeDelta) -> Self {
        Self::MaxAge(age)
    }

    /// Creates a max-age rule from a number of days.
    ///
    /// Saturates at the largest representable duration.
    #[must_use]
    pub fn max_age_days(days: u32) -> Self {
        Self::MaxAge(TimeDelta::try_days(i64::from(days)).unwrap_or(TimeDelta::MAX))
    }

    /// Creates a max-versions rule.
    #[must_use]
    pub const fn max_versions(n: u32) -> Self {
        Self::MaxVersions(n)
    }

    /// Creates a union of the given rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Structural`] if `rules` is empty.
    pub fn union(rules: impl IntoIterator<Item = Self>) -> Result<Self> {
        let rules: Vec<Self> = rules.into_iter().collect();
        if rules.is_empty() {
            return Err(Error::Structural("union has no child rules".to_string()));
        }
        Ok(Self::Union(rules))
    }

    /// Creates an intersection of the given rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Structural`] if `rules` is empty.
    pub fn intersection(rules: impl IntoIterator<Item = Self>) -> Result<Self> {
        let rules: Vec<Self> = rules.into_iter().collect();
        if rules.is_empty() {
            return Err(Error::Structural(
                "intersection has no child rules".to_string(),
            ));
        }
        Ok(Self::Intersection(rules))
    }

    /// Returns the rule kind as a string slice.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MaxAge(_) => "max_age",
            Self::MaxVersions(_) => "max_versions",
            Self::Union(_) => "union",
            Self::Intersection(_) => "intersection",
        }
    }

    /// Returns `true` for unions and intersections.
    #[must_use]
    pub const fn is_composite(&self) -> bool {
        matches!(self, Self::Union(_) | Self::Intersection(_))
    }

    /// Returns the child rules; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Union(children) | Self::Intersection(children) => children,
            Self::MaxAge(_) | Self::MaxVersions(_) => &[],
        }
    }

    /// Returns the nesting depth of the tree. A lone leaf has depth 1.
    ///
    /// Walks the tree with an explicit stack, so arbitrarily deep trees are
    /// measured without recursion.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1_usize)];
        while let Some((rule, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(rule.children().iter().map(|child| (child, depth + 1)));
        }
        deepest
    }

    /// Returns the total number of rules in the tree, composites included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(rule) = stack.pop() {
            count += 1;
            stack.extend(rule.children());
        }
        count
    }
}

/// Tears the tree down with a heap worklist instead of recursive drop glue.
impl Drop for GcRule {
    fn drop(&mut self) {
        let mut pending = match self {
            Self::Union(children) | Self::Intersection(children) => std::mem::take(children),
            Self::MaxAge(_) | Self::MaxVersions(_) => return,
        };
        while let Some(mut rule) = pending.pop() {
            if let Self::Union(children) | Self::Intersection(children) = &mut rule {
                pending.append(children);
            }
        }
    }
}

/// Renders the rule in policy syntax (`maxage=5d or maxversions=2`).
///
/// Nested composites are always parenthesized, so the output parses back to
/// an equivalent tree.
impl fmt::Display for GcRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxAge(age) => write!(f, "maxage={}", crate::policy::format_duration(*age)),
            Self::MaxVersions(n) => write!(f, "maxversions={n}"),
            Self::Union(children) => write_joined(f, children, " or "),
            Self::Intersection(children) => write_joined(f, children, " and "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[GcRule], separator: &str) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        if child.is_composite() {
            write!(f, "({child})")?;
        } else {
            write!(f, "{child}")?;
        }
    }
    Ok(())
}
