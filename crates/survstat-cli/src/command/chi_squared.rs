use clap::Args;
use survstat_stats::chi_squared;

#[derive(Debug, Clone, Args)]
pub(crate) struct ChiSquaredArg {
    /// Value of the statistic
    #[arg(allow_negative_numbers = true)]
    pub x: f64,

    /// Degrees of freedom
    #[arg(long, default_value_t = 1.0)]
    pub df: f64,
}

pub(crate) fn run(arg: &ChiSquaredArg) {
    let cdf = chi_squared::chi_squared_cdf(arg.x, arg.df);
    if cdf.is_nan() {
        log::warn!("Chi-squared CDF undefined for x={}, df={}", arg.x, arg.df);
    }

    println!("Chi-squared distribution (df={})", arg.df);
    println!("  {:<12} {:>16}", "x", arg.x);
    println!("  {:<12} {:>16.10}", "P(X <= x)", cdf);
    println!("  {:<12} {:>16.10}", "P(X > x)", 1.0 - cdf);
}
