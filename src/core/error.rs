#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Configuration,
    ResourceLimit,
    Internal,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("num_simulations must be >= 1")]
    NoSimulations,

    #[error("percentile {0} is outside [0, 100]")]
    PercentileOutOfRange(f64),

    #[error("percentile {0} was requested more than once")]
    DuplicatePercentile(f64),

    #[error("unsupported distribution type '{0}' (expected 'normal' or 'laplace')")]
    UnsupportedDistribution(String),

    #[error("life_expectancy ({life_expectancy}) must be greater than current_age ({current_age})")]
    EmptyHorizon {
        current_age: u32,
        life_expectancy: u32,
    },

    #[error("invalid parameter: {field} - {message}")]
    InvalidParameter {
        field: &'static str,
        message: String,
    },

    #[error("num_simulations {requested} exceeds the maximum of {max}")]
    SimulationLimitExceeded { requested: u32, max: u32 },

    #[error("simulated horizon of {years} years exceeds the maximum of {max}")]
    HorizonLimitExceeded { years: u32, max: u32 },

    #[error("no simulated values recorded for age {0}")]
    MissingYear(u32),

    #[error("cannot analyze an empty balance vector")]
    EmptyBalances,

    #[error("balances at age {age} are no longer finite")]
    NonFiniteBalance { age: u32 },

    #[error("no path holds the {percentile}th percentile balance {value}")]
    UnmatchedPercentile { percentile: f64, value: f64 },

    #[error("path index {index} is out of range for {paths} paths")]
    PathOutOfRange { index: usize, paths: usize },
}

impl SimulationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimulationError::NoSimulations
            | SimulationError::PercentileOutOfRange(_)
            | SimulationError::DuplicatePercentile(_)
            | SimulationError::UnsupportedDistribution(_)
            | SimulationError::EmptyHorizon { .. }
            | SimulationError::InvalidParameter { .. } => ErrorKind::Configuration,
            SimulationError::SimulationLimitExceeded { .. }
            | SimulationError::HorizonLimitExceeded { .. } => ErrorKind::ResourceLimit,
            SimulationError::MissingYear(_)
            | SimulationError::EmptyBalances
            | SimulationError::NonFiniteBalance { .. }
            | SimulationError::UnmatchedPercentile { .. }
            | SimulationError::PathOutOfRange { .. } => ErrorKind::Internal,
        }
    }

    pub fn is_client_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal)
    }
}
