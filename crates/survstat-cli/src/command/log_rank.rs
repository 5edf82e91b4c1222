use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use survstat_stats::{
    log_rank::LogRankTest,
    observation::{GroupRawResult, GroupResultCollection, aggregate_time_points},
};

use crate::util::{self, Output};

#[derive(Debug, Clone, Args)]
pub(crate) struct LogRankArg {
    /// Path to the survival results JSON file
    pub input: PathBuf,

    /// Identifier of the first group (defaults to the first group in the file)
    #[arg(long)]
    pub group1: Option<String>,

    /// Identifier of the second group (defaults to the second group in the file)
    #[arg(long)]
    pub group2: Option<String>,

    /// Output file path for the test result as JSON
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub(crate) fn run(arg: &LogRankArg) -> anyhow::Result<()> {
    let collection = util::read_results_file(&arg.input)?;
    let (group1, group2) =
        select_groups(&collection, arg.group1.as_deref(), arg.group2.as_deref())?;

    for group in [group1, group2] {
        if let Some((initial_count, first_at_risk)) = ignored_initial_count(group) {
            log::warn!(
                "Group {}: initial_count {initial_count} ignored, log-rank starts from {first_at_risk} at risk",
                group.group_id
            );
        }
    }

    let test = LogRankTest::compute(&group1.time_points, &group2.time_points).with_context(
        || {
            format!(
                "Failed to merge risk sets of groups {} and {}",
                group1.group_id, group2.group_id
            )
        },
    )?;

    print_report(&group1.group_id, &group2.group_id, &test);

    if let Some(path) = &arg.output {
        Output::save_json(&test, Some(path.clone()))?;
    }
    Ok(())
}

/// Pick the two groups to compare
///
/// An explicit identifier selects that group; a missing one falls back to
/// the first (or second) group of the collection.
fn select_groups<'a>(
    collection: &'a GroupResultCollection,
    group1: Option<&str>,
    group2: Option<&str>,
) -> anyhow::Result<(&'a GroupRawResult, &'a GroupRawResult)> {
    if collection.results.len() < 2 {
        anyhow::bail!(
            "Log-rank test needs at least two groups, found {}",
            collection.results.len()
        );
    }
    let pick = |id: Option<&str>, default: usize| match id {
        Some(id) => util::find_group(collection, id),
        None => Ok(&collection.results[default]),
    };
    Ok((pick(group1, 0)?, pick(group2, 1)?))
}

/// Returns `(initial_count, first_at_risk)` when the group declares an
/// initial count that differs from the risk set the test starts from.
fn ignored_initial_count(group: &GroupRawResult) -> Option<(u64, u64)> {
    let initial_count = group.initial_count?;
    let first_at_risk = aggregate_time_points(&group.time_points)
        .first()
        .map_or(0, |p| p.at_risk);
    (initial_count != first_at_risk).then_some((initial_count, first_at_risk))
}

fn print_report(group1: &str, group2: &str, test: &LogRankTest) {
    println!("Log-rank test: {group1} vs {group2}");
    println!("  {}", "-".repeat(40));
    println!("  {:<24} {:>15}", "Event time points", test.event_time_points);
    println!("  {:<24} {:>15.4}", "Observed (group 1)", test.observed);
    println!("  {:<24} {:>15.4}", "Expected (group 1)", test.expected);
    println!("  {:<24} {:>15.4}", "O - E", test.observed_minus_expected);
    println!("  {:<24} {:>15.4}", "Variance", test.variance);
    println!("  {:<24} {:>15.4}", "Chi-squared (df=1)", test.chi_squared);
    println!("  {:<24} {:>15.6}", "p-value", test.p_value);
}
