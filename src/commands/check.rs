//! Single-cell check command.

use anyhow::Context;
use cellgc::config::CellgcConfig;
use cellgc::{CellMetadata, parse_duration};

use super::{engine, resolve_rule};
use crate::RuleSource;

/// Check command.
///
/// Prints `drop` or `retain` for a cell of the given age and rank.
///
/// # Examples
///
/// ```bash
/// cellgc check --policy "maxversions=2 and maxage=5d" --age 6d --rank 3
/// ```
pub fn cmd_check(
    config: &CellgcConfig,
    source: &RuleSource,
    age: &str,
    rank: u64,
) -> anyhow::Result<()> {
    let rule = resolve_rule(config, source)?;
    let age = parse_duration(age).context("invalid --age")?;
    let cell = CellMetadata::new(age, rank);

    let dropped = engine(config)
        .should_drop(&rule, &cell)
        .context("evaluation failed")?;

    tracing::debug!(rule = %rule, rank, dropped, "Evaluated cell");
    println!("{}", if dropped { "drop" } else { "retain" });

    Ok(())
}
