mod analysis;
mod cashflow;
mod engine;
mod error;
mod types;

pub use analysis::{
    balance_band, balance_percentiles, percentile_trajectories, summarize, summary_statistics,
};
pub use cashflow::project_cashflows;
pub use engine::{Laplace, SimulatedPaths, derive_year_seed, run_simulations};
pub use error::{ErrorKind, SimulationError};
pub use types::{
    BalanceBand, BalanceHistory, CashflowProjection, DEFAULT_MAX_SIMULATIONS, DistributionType,
    MAX_YEARS, PathHistory, PercentileEntry, PercentileSet, PercentileTrajectory, ReturnHistory,
    SimulationConfig, SimulationOutput, SimulationSummary, Source, SummaryStatistics,
};

const BAND_LOWER_PERCENTILE: f64 = 5.0;
const BAND_UPPER_PERCENTILE: f64 = 95.0;

/// Projects cashflows, simulates every path and analyzes the horizon year.
pub fn run_simulation(config: &SimulationConfig) -> Result<SimulationOutput, SimulationError> {
    config.validate()?;

    let cashflows = project_cashflows(config);
    let paths = run_simulations(config, &cashflows.net_income_by_year)?;

    let horizon = config.horizon_year();
    let summary = summarize(&paths.balance_history, &paths.return_history, horizon)?;
    let horizon_balances = paths.balance_history.year(horizon)?;
    let percentile_sets = balance_percentiles(&config.percentiles, horizon_balances)?;
    let percentile_balance_history =
        percentile_trajectories(&percentile_sets, &paths.balance_history)?;
    let horizon_balance_band =
        balance_band(horizon_balances, BAND_LOWER_PERCENTILE, BAND_UPPER_PERCENTILE)?;

    tracing::debug!(
        seed = paths.seed,
        horizon,
        success_rate = summary.success_rate,
        "simulation complete"
    );

    Ok(SimulationOutput {
        seed: paths.seed,
        summary,
        percentile_sets,
        balance_history: paths.balance_history,
        return_history: paths.return_history,
        percentile_balance_history,
        cashflows,
        horizon_balance_band,
    })
}
