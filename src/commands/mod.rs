//! Command handlers module.
//!
//! This module organizes the CLI command implementations into separate files:
//! - `check.rs`: Keep/drop decision for a single cell
//! - `validate.rs`: Policy validation and normalization
//! - `plan.rs`: Compaction preview for one column

mod check;
mod plan;
mod validate;

use anyhow::{Context, bail};
use cellgc::config::CellgcConfig;
use cellgc::{GcRule, GcRuleEngine, parse_policy_with_limit};

use crate::RuleSource;

// Re-export command functions
pub use check::cmd_check;
pub use plan::cmd_plan;
pub use validate::cmd_validate;

/// Resolves the rule a command operates on.
///
/// Inline policies are parsed with the configured depth limit; family
/// policies were already validated when the config was loaded.
fn resolve_rule(config: &CellgcConfig, source: &RuleSource) -> anyhow::Result<GcRule> {
    if let Some(policy) = &source.policy {
        return parse_policy_with_limit(policy, config.max_depth)
            .with_context(|| format!("invalid policy '{policy}'"));
    }

    let Some(family) = &source.family else {
        bail!("either --policy or --family is required");
    };

    config
        .family_rule(family)
        .cloned()
        .with_context(|| format!("no policy configured for column family '{family}'"))
}

/// Builds the engine for the loaded configuration.
const fn engine(config: &CellgcConfig) -> GcRuleEngine {
    GcRuleEngine::from_config(config)
}
