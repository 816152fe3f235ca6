use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use retirement_sim::api::{
    self, ServerConfig,
    cli::{Cli, Command},
};

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("retirement_sim=info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            max_simulations,
        } => {
            let config = ServerConfig {
                port,
                max_simulations,
            };
            if let Err(e) = api::run_http_server(config).await {
                tracing::error!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Run {
            config,
            output,
            seed,
            max_simulations,
        } => {
            if let Err(e) =
                api::run_inputs_file(&config, seed, max_simulations, output.as_deref())
            {
                tracing::error!("Simulation failed: {e}");
                std::process::exit(1);
            }
        }
    }
}
