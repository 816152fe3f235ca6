use std::collections::BTreeMap;
use std::f64::consts::SQRT_2;

use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Exp1, Normal};

use super::error::SimulationError;
use super::types::{BalanceHistory, DistributionType, ReturnHistory, SimulationConfig};

#[derive(Debug, Clone)]
pub struct SimulatedPaths {
    /// Master seed every yearly stream was derived from.
    pub seed: u64,
    pub balance_history: BalanceHistory,
    pub return_history: ReturnHistory,
}

/// Laplace(loc, scale), drawn as the difference of two unit exponentials.
#[derive(Debug, Clone, Copy)]
pub struct Laplace {
    loc: f64,
    scale: f64,
}

impl Laplace {
    pub fn new(loc: f64, scale: f64) -> Result<Self, SimulationError> {
        if !loc.is_finite() || !scale.is_finite() || scale < 0.0 {
            return Err(SimulationError::InvalidParameter {
                field: "return_std",
                message: format!("laplace scale must be finite and >= 0, got {scale}"),
            });
        }
        Ok(Self { loc, scale })
    }

    /// Scale `b` giving standard deviation `std`, from `std = b * sqrt(2)`.
    pub fn from_std(loc: f64, std: f64) -> Result<Self, SimulationError> {
        Self::new(loc, std / SQRT_2)
    }
}

impl Distribution<f64> for Laplace {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let e1: f64 = Exp1.sample(rng);
        let e2: f64 = Exp1.sample(rng);
        self.loc + self.scale * (e1 - e2)
    }
}

#[derive(Debug, Clone, Copy)]
enum ReturnSampler {
    Normal(Normal<f64>),
    Laplace(Laplace),
}

impl ReturnSampler {
    fn from_config(config: &SimulationConfig) -> Result<Self, SimulationError> {
        match config.distribution_type {
            DistributionType::Normal => Normal::new(config.annual_return, config.return_std)
                .map(ReturnSampler::Normal)
                .map_err(|e| SimulationError::InvalidParameter {
                    field: "return_std",
                    message: e.to_string(),
                }),
            DistributionType::Laplace => {
                Laplace::from_std(config.annual_return, config.return_std).map(ReturnSampler::Laplace)
            }
        }
    }
}

impl Distribution<f64> for ReturnSampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            ReturnSampler::Normal(d) => d.sample(rng),
            ReturnSampler::Laplace(d) => d.sample(rng),
        }
    }
}

/// Simulates every path year by year.
///
/// Each year's net cashflow is added before that year's return is applied.
/// Returns for a year come from their own stream seeded by
/// [`derive_year_seed`], so the draws never depend on which other years ran.
pub fn run_simulations(
    config: &SimulationConfig,
    net_income_by_year: &BTreeMap<u32, f64>,
) -> Result<SimulatedPaths, SimulationError> {
    config.validate()?;
    let sampler = ReturnSampler::from_config(config)?;
    for age in config.years() {
        if !net_income_by_year.contains_key(&age) {
            return Err(SimulationError::MissingYear(age));
        }
    }

    let seed = config
        .random_state
        .unwrap_or_else(|| rand::rng().random::<u64>());
    let paths = config.num_simulations as usize;

    tracing::debug!(
        seed,
        paths,
        years = config.num_years(),
        distribution = %config.distribution_type,
        "running simulations"
    );

    let mut balances = vec![config.current_balance; paths];
    let mut balance_history = BalanceHistory::default();
    let mut return_history = ReturnHistory::default();

    for age in config.years() {
        let net_income = net_income_by_year[&age];
        let mut rng = StdRng::seed_from_u64(derive_year_seed(seed, age));
        let returns: Vec<f64> = (&sampler).sample_iter(&mut rng).take(paths).collect();

        apply_year(&mut balances, &returns, net_income);
        if balances.iter().any(|b| !b.is_finite()) {
            return Err(SimulationError::NonFiniteBalance { age });
        }

        balance_history.record(age, balances.clone());
        return_history.record(age, returns);
    }

    Ok(SimulatedPaths {
        seed,
        balance_history,
        return_history,
    })
}

#[cfg(feature = "parallel")]
fn apply_year(balances: &mut [f64], returns: &[f64], net_income: f64) {
    use rayon::prelude::*;

    balances
        .par_iter_mut()
        .zip(returns.par_iter())
        .for_each(|(balance, r)| *balance = step_balance(*balance, net_income, *r));
}

#[cfg(not(feature = "parallel"))]
fn apply_year(balances: &mut [f64], returns: &[f64], net_income: f64) {
    for (balance, r) in balances.iter_mut().zip(returns) {
        *balance = step_balance(*balance, net_income, *r);
    }
}

fn step_balance(balance: f64, net_income: f64, annual_return: f64) -> f64 {
    (balance + net_income) * (1.0 + annual_return)
}

pub fn derive_year_seed(master_seed: u64, age: u32) -> u64 {
    splitmix64(master_seed ^ ((age as u64) << 32))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
