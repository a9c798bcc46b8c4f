//! Compaction preview command.

use anyhow::Context;
use cellgc::config::CellgcConfig;
use cellgc::gc::{CompactionPlan, CompactionPlanner};
use cellgc::parse_duration;
use chrono::{DateTime, Utc};

use super::{engine, resolve_rule};
use crate::RuleSource;

/// Plan command.
///
/// Treats `ages` as every stored version of one column, measured from now,
/// and shows which versions the rule drops.
///
/// # Examples
///
/// ```bash
/// cellgc plan --family metrics --ages 1h,2d,6d,7d --dry-run
/// ```
pub fn cmd_plan(
    config: &CellgcConfig,
    source: &RuleSource,
    ages: &[String],
    dry_run: bool,
) -> anyhow::Result<()> {
    let rule = resolve_rule(config, source)?;
    let planner = CompactionPlanner::new(engine(config), rule)?;

    let now = Utc::now();
    let versions = version_timestamps(now, ages)?;

    let plan = planner.plan_column(now, &versions, dry_run)?;
    display_plan(&plan, now);

    Ok(())
}

/// Converts version ages into write timestamps measured back from `now`.
fn version_timestamps(
    now: DateTime<Utc>,
    ages: &[String],
) -> anyhow::Result<Vec<DateTime<Utc>>> {
    ages.iter()
        .map(|age| {
            let delta = parse_duration(age).with_context(|| format!("invalid age '{age}'"))?;
            now.checked_sub_signed(delta)
                .with_context(|| format!("age '{age}' reaches before the earliest timestamp"))
        })
        .collect()
}

/// Displays the plan to the user.
fn display_plan(plan: &CompactionPlan, now: DateTime<Utc>) {
    println!("cellgc compaction plan");
    println!("======================");
    println!();

    let mut rows: Vec<_> = plan
        .retained
        .iter()
        .map(|ts| (*ts, "retain"))
        .chain(plan.dropped.iter().map(|ts| (*ts, "drop")))
        .collect();
    rows.sort_unstable_by(|a, b| b.0.cmp(&a.0));

    for (rank, (timestamp, action)) in rows.iter().enumerate() {
        let age = now.signed_duration_since(*timestamp);
        println!(
            "  #{:<3} {:<6} age {}",
            rank + 1,
            action,
            cellgc::policy::format_duration(age)
        );
    }

    println!();
    println!("{}", plan.summary());
}
