use super::error::SimulationError;
use super::types::{
    BalanceBand, BalanceHistory, PercentileEntry, PercentileSet, PercentileTrajectory,
    ReturnHistory, SimulationSummary, SummaryStatistics,
};

/// Absolute tolerance when matching a percentile value back to a path.
const INDEX_MATCH_TOLERANCE: f64 = 0.01;

pub fn summarize(
    balance_history: &BalanceHistory,
    return_history: &ReturnHistory,
    year: u32,
) -> Result<SimulationSummary, SimulationError> {
    let balances = balance_history.year(year)?;
    let returns = return_history.year(year)?;
    if balances.iter().any(|b| !b.is_finite()) {
        return Err(SimulationError::NonFiniteBalance { age: year });
    }

    let solvent = balances.iter().filter(|b| **b >= 0.0).count();

    Ok(SimulationSummary {
        year,
        balance_summary: summary_statistics(balances)?,
        return_summary: summary_statistics(returns)?,
        success_rate: solvent as f64 / balances.len() as f64,
    })
}

pub fn summary_statistics(values: &[f64]) -> Result<SummaryStatistics, SimulationError> {
    if values.is_empty() {
        return Err(SimulationError::EmptyBalances);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(SummaryStatistics {
        min,
        max,
        mean,
        std: variance.sqrt(),
    })
}

pub fn balance_percentiles(
    percentiles: &[f64],
    balances: &[f64],
) -> Result<PercentileSet, SimulationError> {
    if balances.is_empty() {
        return Err(SimulationError::EmptyBalances);
    }

    let mut sorted = balances.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    percentiles
        .iter()
        .map(|&p| {
            if !p.is_finite() || !(0.0..=100.0).contains(&p) {
                return Err(SimulationError::PercentileOutOfRange(p));
            }
            let balance_amount = sorted[closest_observation_rank(sorted.len(), p)];
            let balance_index = balances
                .iter()
                .position(|b| (b - balance_amount).abs() <= INDEX_MATCH_TOLERANCE)
                .ok_or(SimulationError::UnmatchedPercentile {
                    percentile: p,
                    value: balance_amount,
                })?;
            Ok(PercentileEntry {
                percentile: p,
                balance_amount,
                balance_index,
            })
        })
        .collect()
}

/// Zero-based rank of the observation closest to the `p`-th percentile.
///
/// On an exact tie between two order statistics the even (one-based) one
/// wins.
fn closest_observation_rank(n: usize, p: f64) -> usize {
    let virtual_index = n as f64 * (p / 100.0) - 1.5;
    let previous = virtual_index.floor();
    let gamma = virtual_index - previous;

    let rank = if gamma == 0.0 && (previous as i64).rem_euclid(2) == 1 {
        previous
    } else {
        previous + 1.0
    };

    rank.clamp(0.0, (n - 1) as f64) as usize
}

pub fn percentile_trajectories(
    percentile_sets: &PercentileSet,
    balance_history: &BalanceHistory,
) -> Result<Vec<PercentileTrajectory>, SimulationError> {
    percentile_sets
        .iter()
        .map(|entry| {
            Ok(PercentileTrajectory {
                percentile: entry.percentile,
                balance_index: entry.balance_index,
                balances: balance_history.path(entry.balance_index)?,
            })
        })
        .collect()
}

/// Balances lying between two interpolated quantiles, inclusive.
pub fn balance_band(
    balances: &[f64],
    lower_percentile: f64,
    upper_percentile: f64,
) -> Result<BalanceBand, SimulationError> {
    for p in [lower_percentile, upper_percentile] {
        if !p.is_finite() || !(0.0..=100.0).contains(&p) {
            return Err(SimulationError::PercentileOutOfRange(p));
        }
    }
    if balances.is_empty() {
        return Err(SimulationError::EmptyBalances);
    }

    let mut sorted = balances.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let lower = interpolated_percentile(&sorted, lower_percentile.min(upper_percentile));
    let upper = interpolated_percentile(&sorted, lower_percentile.max(upper_percentile));

    Ok(BalanceBand {
        lower_percentile,
        upper_percentile,
        lower,
        upper,
        balances: balances
            .iter()
            .copied()
            .filter(|b| (lower..=upper).contains(b))
            .collect(),
    })
}

fn interpolated_percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let w = rank - lower as f64;
        sorted[lower] * (1.0 - w) + sorted[upper] * w
    }
}
