use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::DEFAULT_MAX_SIMULATIONS;

#[derive(Parser, Debug)]
#[command(
    name = "retirement-sim",
    about = "Monte Carlo retirement balance simulator (income/spending streams + stochastic returns)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON simulation API over HTTP.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(
            long,
            default_value_t = DEFAULT_MAX_SIMULATIONS,
            help = "Reject requests asking for more paths than this"
        )]
        max_simulations: u32,
    },
    /// Run one simulation from a JSON inputs file and print the results.
    Run {
        #[arg(long, default_value = "retirement_inputs.json")]
        config: PathBuf,
        #[arg(long, help = "Write the JSON results here instead of stdout")]
        output: Option<PathBuf>,
        #[arg(long, help = "Override random_state from the inputs file")]
        seed: Option<u64>,
        #[arg(long, default_value_t = DEFAULT_MAX_SIMULATIONS)]
        max_simulations: u32,
    },
}
