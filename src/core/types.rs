use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::SimulationError;

pub const DEFAULT_MAX_SIMULATIONS: u32 = 10_000;
pub const MAX_YEARS: u32 = 150;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionType {
    Normal,
    Laplace,
}

impl FromStr for DistributionType {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(DistributionType::Normal),
            "laplace" => Ok(DistributionType::Laplace),
            _ => Err(SimulationError::UnsupportedDistribution(s.to_string())),
        }
    }
}

impl fmt::Display for DistributionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionType::Normal => f.write_str("normal"),
            DistributionType::Laplace => f.write_str("laplace"),
        }
    }
}

/// A named cashflow stream active over `[starting_age, ending_age)`.
///
/// Whether it adds to or draws from the balance depends on which list of the
/// config it sits in.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Source {
    pub title: String,
    pub amount: f64,
    pub starting_age: u32,
    pub ending_age: u32,
    pub growth: f64,
}

impl Source {
    pub fn is_active(&self, age: u32) -> bool {
        self.starting_age <= age && age < self.ending_age
    }

    pub fn grown_amount(&self, age: u32) -> f64 {
        let years_active = age.saturating_sub(self.starting_age);
        self.amount * (1.0 + self.growth).powi(years_active as i32)
    }
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub current_balance: f64,
    pub current_age: u32,
    pub life_expectancy: u32,
    pub inflation: f64,
    pub annual_return: f64,
    pub return_std: f64,
    pub distribution_type: DistributionType,
    pub num_simulations: u32,
    pub random_state: Option<u64>,
    pub percentiles: Vec<f64>,
    pub income_sources: Vec<Source>,
    pub spending_sources: Vec<Source>,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.num_simulations == 0 {
            return Err(SimulationError::NoSimulations);
        }

        if self.life_expectancy <= self.current_age {
            return Err(SimulationError::EmptyHorizon {
                current_age: self.current_age,
                life_expectancy: self.life_expectancy,
            });
        }

        for (field, value) in [
            ("current_balance", self.current_balance),
            ("inflation", self.inflation),
            ("annual_return", self.annual_return),
            ("return_std", self.return_std),
        ] {
            if !value.is_finite() {
                return Err(SimulationError::InvalidParameter {
                    field,
                    message: format!("must be finite, got {value}"),
                });
            }
        }

        if self.return_std < 0.0 {
            return Err(SimulationError::InvalidParameter {
                field: "return_std",
                message: format!("must be >= 0, got {}", self.return_std),
            });
        }

        for source in self.income_sources.iter().chain(&self.spending_sources) {
            if !source.amount.is_finite() || !source.growth.is_finite() {
                return Err(SimulationError::InvalidParameter {
                    field: "sources",
                    message: format!("source '{}' has a non-finite amount or growth", source.title),
                });
            }
        }

        for (i, &p) in self.percentiles.iter().enumerate() {
            if !p.is_finite() || !(0.0..=100.0).contains(&p) {
                return Err(SimulationError::PercentileOutOfRange(p));
            }
            if self.percentiles[..i].contains(&p) {
                return Err(SimulationError::DuplicatePercentile(p));
            }
        }

        Ok(())
    }

    /// Bounds history size (years x paths) before anything is allocated.
    pub fn check_simulation_limit(&self, max: u32) -> Result<(), SimulationError> {
        if self.num_simulations > max {
            return Err(SimulationError::SimulationLimitExceeded {
                requested: self.num_simulations,
                max,
            });
        }
        let years = self.life_expectancy.saturating_sub(self.current_age);
        if years > MAX_YEARS {
            return Err(SimulationError::HorizonLimitExceeded {
                years,
                max: MAX_YEARS,
            });
        }
        Ok(())
    }

    pub fn years(&self) -> std::ops::Range<u32> {
        self.current_age..self.life_expectancy
    }

    pub fn horizon_year(&self) -> u32 {
        self.life_expectancy.saturating_sub(1)
    }

    pub fn num_years(&self) -> usize {
        self.years().len()
    }
}

/// Per-year, per-path values. Path `i` keeps index `i` in every year.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PathHistory(BTreeMap<u32, Vec<f64>>);

pub type BalanceHistory = PathHistory;
pub type ReturnHistory = PathHistory;

impl PathHistory {
    pub(crate) fn record(&mut self, age: u32, values: Vec<f64>) {
        self.0.insert(age, values);
    }

    pub fn year(&self, age: u32) -> Result<&[f64], SimulationError> {
        self.0
            .get(&age)
            .map(Vec::as_slice)
            .ok_or(SimulationError::MissingYear(age))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &[f64])> + '_ {
        self.0.iter().map(|(age, values)| (*age, values.as_slice()))
    }

    pub fn path(&self, index: usize) -> Result<BTreeMap<u32, f64>, SimulationError> {
        self.iter()
            .map(|(age, values)| {
                values
                    .get(index)
                    .map(|v| (age, *v))
                    .ok_or(SimulationError::PathOutOfRange {
                        index,
                        paths: values.len(),
                    })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CashflowProjection {
    pub income_by_year: BTreeMap<u32, f64>,
    pub spending_by_year: BTreeMap<u32, f64>,
    pub net_income_by_year: BTreeMap<u32, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileEntry {
    pub percentile: f64,
    pub balance_amount: f64,
    pub balance_index: usize,
}

pub type PercentileSet = Vec<PercentileEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub year: u32,
    pub balance_summary: SummaryStatistics,
    pub return_summary: SummaryStatistics,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileTrajectory {
    pub percentile: f64,
    pub balance_index: usize,
    pub balances: BTreeMap<u32, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceBand {
    pub lower_percentile: f64,
    pub upper_percentile: f64,
    pub lower: f64,
    pub upper: f64,
    pub balances: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationOutput {
    pub seed: u64,
    pub summary: SimulationSummary,
    pub percentile_sets: PercentileSet,
    pub balance_history: BalanceHistory,
    pub return_history: ReturnHistory,
    pub percentile_balance_history: Vec<PercentileTrajectory>,
    #[serde(flatten)]
    pub cashflows: CashflowProjection,
    pub horizon_balance_band: BalanceBand,
}
