use clap::{Parser, Subcommand};

use self::{chi_squared::ChiSquaredArg, curves::CurvesArg, log_rank::LogRankArg};

mod chi_squared;
mod curves;
mod log_rank;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Enable debug logging (overrides the default `warn` filter)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Build Kaplan-Meier survival curves for every group
    Curves(#[clap(flatten)] CurvesArg),
    /// Compare two groups with the log-rank test
    ///
    /// Each group's risk set starts at the at-risk count of its earliest time
    /// point. A group's `initial_count` is not used by this test; a mismatch
    /// is reported as a warning.
    LogRank(#[clap(flatten)] LogRankArg),
    /// Evaluate the chi-squared cumulative distribution function
    ChiSquared(#[clap(flatten)] ChiSquaredArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_logger(args.verbose);

    match args.mode {
        Mode::Curves(arg) => curves::run(&arg)?,
        Mode::LogRank(arg) => log_rank::run(&arg)?,
        Mode::ChiSquared(arg) => chi_squared::run(&arg),
    }
    Ok(())
}

fn init_logger(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}
