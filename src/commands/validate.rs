//! Policy validation command.

use cellgc::config::CellgcConfig;

use super::{engine, resolve_rule};
use crate::RuleSource;

/// Validate command.
///
/// Parsing already validates; this reports the normalized policy and the
/// shape of the tree.
pub fn cmd_validate(config: &CellgcConfig, source: &RuleSource) -> anyhow::Result<()> {
    let rule = resolve_rule(config, source)?;
    engine(config).validate(&rule)?;

    println!("Policy:  {rule}");
    println!("Kind:    {}", rule.kind());
    println!("Depth:   {} (limit {})", rule.depth(), config.max_depth);
    println!("Rules:   {}", rule.node_count());

    Ok(())
}
