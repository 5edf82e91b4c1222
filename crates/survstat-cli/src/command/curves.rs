//! Kaplan-Meier curve command
//!
//! Builds one survival curve per group of a results file, prints a summary
//! table and exports the curves as JSON and optionally CSV.

use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Args;
use survstat_stats::curve::{SurvivalCurve, SurvivalCurves};

use crate::util::{self, Output};

#[derive(Debug, Clone, Args)]
pub(crate) struct CurvesArg {
    /// Path to the survival results JSON file
    pub input: PathBuf,

    /// Output file path for the curves JSON (stdout if omitted)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Output file path for the curve points as CSV
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

pub(crate) fn run(arg: &CurvesArg) -> anyhow::Result<()> {
    let collection = util::read_results_file(&arg.input)?;
    let curves = SurvivalCurves::build(&collection.results)
        .with_context(|| format!("Failed to build curves from {}", arg.input.display()))?;

    // stdout may carry the JSON, so the summary goes to stderr
    print_summary(&curves);

    if let Some(path) = &arg.csv {
        save_curves_csv(path, &curves)?;
    }

    Output::save_json(&curves, arg.output.clone())?;
    Ok(())
}

const SUMMARY_WIDTH: usize = 20 + 8 + 8 + 10 + 10 + 10 + 5;

fn print_summary(curves: &SurvivalCurves) {
    eprintln!(
        "  {:<20} {:>8} {:>8} {:>10} {:>10} {:>10}",
        "Group", "At risk", "Events", "Censored", "Survival", "Median",
    );
    eprintln!("  {}", "-".repeat(SUMMARY_WIDTH));
    for curve in &curves.curves {
        eprintln!("{}", format_summary_row(curve));
    }
}

fn format_summary_row(curve: &SurvivalCurve) -> String {
    let (events, censorings) = curve
        .last_point()
        .map_or((0, 0), |p| (p.cumul_events, p.cumul_censorings));
    let median_str = curve
        .median_survival()
        .map_or("N/A".to_string(), |m| format!("{m:.1}"));
    format!(
        "  {:<20} {:>8} {:>8} {:>10} {:>10.4} {:>10}",
        curve.group_id,
        curve.initial_count(),
        events,
        censorings,
        curve.final_survival(),
        median_str,
    )
}

fn curves_csv(curves: &SurvivalCurves) -> anyhow::Result<String> {
    let mut csv_content = String::from(
        "group_id,time_point,at_risk,events,censorings,remaining,prob,cumul,variance\n",
    );
    for curve in &curves.curves {
        for p in &curve.points {
            writeln!(
                &mut csv_content,
                "{},{},{},{},{},{},{},{},{}",
                curve.group_id,
                p.time_point,
                p.at_risk,
                p.nof_events,
                p.nof_censorings,
                p.remaining,
                p.prob,
                p.cumul,
                p.variance,
            )
            .with_context(|| format!("Failed to write CSV data for group {}", curve.group_id))?;
        }
    }
    Ok(csv_content)
}

fn save_curves_csv(path: &Path, curves: &SurvivalCurves) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    let csv_content = curves_csv(curves)?;
    fs::write(path, csv_content)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
    log::info!("Curve points saved to {}", path.display());
    Ok(())
}
