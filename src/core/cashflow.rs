use super::types::{CashflowProjection, SimulationConfig};

/// Projects income, spending and net cashflow for every simulated year.
///
/// Growth compounds from each source's own start age while inflation on
/// spending compounds from the first simulated year.
pub fn project_cashflows(config: &SimulationConfig) -> CashflowProjection {
    let mut projection = CashflowProjection::default();

    for (years_from_start, age) in config.years().enumerate() {
        let income: f64 = config
            .income_sources
            .iter()
            .filter(|source| source.is_active(age))
            .map(|source| source.grown_amount(age))
            .fold(0.0, |total, amount| total + amount);

        let inflation_factor = (1.0 + config.inflation).powi(years_from_start as i32);
        let spending: f64 = config
            .spending_sources
            .iter()
            .filter(|source| source.is_active(age))
            .fold(0.0, |total, source| {
                total - source.grown_amount(age) * inflation_factor
            });

        projection.income_by_year.insert(age, income);
        projection.spending_by_year.insert(age, spending);
        projection.net_income_by_year.insert(age, income + spending);
    }

    projection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DistributionType, Source};
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn source(title: &str, amount: f64, starting_age: u32, ending_age: u32, growth: f64) -> Source {
        Source {
            title: title.to_string(),
            amount,
            starting_age,
            ending_age,
            growth,
        }
    }

    fn sample_config() -> SimulationConfig {
        SimulationConfig {
            current_balance: 500_000.0,
            current_age: 60,
            life_expectancy: 70,
            inflation: 0.0,
            annual_return: 0.05,
            return_std: 0.1,
            distribution_type: DistributionType::Normal,
            num_simulations: 10,
            random_state: Some(1),
            percentiles: vec![10.0, 50.0, 90.0],
            income_sources: Vec::new(),
            spending_sources: Vec::new(),
        }
    }

    #[test]
    fn single_income_year_matches_amount() {
        let mut config = sample_config();
        config.current_age = 60;
        config.life_expectancy = 61;
        config.income_sources = vec![source("pension", 100.0, 60, 61, 0.0)];

        let projection = project_cashflows(&config);
        assert_eq!(projection.net_income_by_year.len(), 1);
        assert_approx(projection.net_income_by_year[&60], 100.0);
        assert_approx(projection.spending_by_year[&60], 0.0);
    }

    #[test]
    fn income_growth_compounds_from_source_start() {
        let mut config = sample_config();
        config.inflation = 0.5;
        config.income_sources = vec![source("rental", 1_000.0, 63, 70, 0.1)];

        let projection = project_cashflows(&config);
        assert_approx(projection.income_by_year[&62], 0.0);
        assert_approx(projection.income_by_year[&63], 1_000.0);
        assert_approx(projection.income_by_year[&65], 1_000.0 * 1.1 * 1.1);
    }

    #[test]
    fn spending_inflation_compounds_from_simulation_start() {
        let mut config = sample_config();
        config.inflation = 0.02;
        config.spending_sources = vec![source("travel", 1_000.0, 63, 66, 0.1)];

        let projection = project_cashflows(&config);
        // Age 64: one year of growth, four years of inflation.
        let expected = -(1_000.0 * 1.1 * 1.02_f64.powi(4));
        assert_approx(projection.spending_by_year[&64], expected);
        assert_approx(projection.net_income_by_year[&64], expected);
        assert_approx(projection.spending_by_year[&66], 0.0);
    }

    #[test]
    fn inflation_does_not_touch_income() {
        let mut config = sample_config();
        config.inflation = 0.03;
        config.income_sources = vec![source("salary", 2_000.0, 60, 70, 0.0)];

        let projection = project_cashflows(&config);
        for value in projection.income_by_year.values() {
            assert_approx(*value, 2_000.0);
        }
    }

    #[test]
    fn empty_interval_contributes_nothing() {
        let mut config = sample_config();
        config.income_sources = vec![source("never", 1_000.0, 65, 65, 0.0)];
        config.spending_sources = vec![source("inverted", 1_000.0, 68, 62, 0.0)];

        let projection = project_cashflows(&config);
        assert!(projection.net_income_by_year.values().all(|v| *v == 0.0));
    }

    #[test]
    fn inactive_years_are_positive_zero() {
        let mut config = sample_config();
        config.spending_sources = vec![source("late", 1_000.0, 68, 70, 0.0)];

        let projection = project_cashflows(&config);
        for age in 60..68 {
            assert!(projection.income_by_year[&age].is_sign_positive());
            assert!(projection.spending_by_year[&age].is_sign_positive());
            assert!(projection.net_income_by_year[&age].is_sign_positive());
        }
        let json = serde_json::to_string(&projection).expect("projection serializes");
        assert!(!json.contains("-0.0"), "{json}");
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_series_cover_every_year_and_net_is_sum(
            current_age in 20u32..80,
            span in 1u32..40,
            income_amount in 0u32..200_000,
            spending_amount in 0u32..200_000,
            income_start_offset in 0u32..40,
            income_len in 0u32..40,
            spending_start_offset in 0u32..40,
            spending_len in 0u32..40,
            growth_bp in -500i32..1000,
            inflation_bp in 0u32..800,
        ) {
            let mut config = sample_config();
            config.current_age = current_age;
            config.life_expectancy = current_age + span;
            config.inflation = inflation_bp as f64 / 10_000.0;
            let income_start = current_age + income_start_offset;
            let spending_start = current_age + spending_start_offset;
            config.income_sources = vec![source(
                "income",
                income_amount as f64,
                income_start,
                income_start + income_len,
                growth_bp as f64 / 10_000.0,
            )];
            config.spending_sources = vec![source(
                "spending",
                spending_amount as f64,
                spending_start,
                spending_start + spending_len,
                growth_bp as f64 / 10_000.0,
            )];

            let projection = project_cashflows(&config);
            let expected_len = (config.life_expectancy - config.current_age) as usize;
            prop_assert_eq!(projection.income_by_year.len(), expected_len);
            prop_assert_eq!(projection.spending_by_year.len(), expected_len);
            prop_assert_eq!(projection.net_income_by_year.len(), expected_len);

            for age in config.years() {
                let income = projection.income_by_year[&age];
                let spending = projection.spending_by_year[&age];
                prop_assert!(income >= 0.0);
                prop_assert!(spending <= 0.0);
                prop_assert_eq!(projection.net_income_by_year[&age], income + spending);
                if !config.income_sources[0].is_active(age) {
                    prop_assert_eq!(income, 0.0);
                }
                if !config.spending_sources[0].is_active(age) {
                    prop_assert_eq!(spending, 0.0);
                }
            }
        }
    }
}
