pub mod cli;

use std::fs;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::core::{
    DistributionType, SimulationConfig, SimulationError, SimulationOutput, Source, run_simulation,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write results: {0}")]
    Write(#[from] io::Error),

    #[error("Invalid simulation payload: {0}")]
    Payload(String),

    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Payload(err.to_string())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Payload(_) => StatusCode::BAD_REQUEST,
            ApiError::Simulation(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Simulation(_) | ApiError::Read { .. } | ApiError::Write(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "simulation request failed");
            return error_response(status, "Internal server error");
        }
        tracing::warn!(error = %self, "rejected simulation request");
        error_response(status, &self.to_string())
    }
}

#[derive(Copy, Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub max_simulations: u32,
}

#[derive(Copy, Clone, Debug)]
struct AppState {
    max_simulations: u32,
}

/// Request body; also the format of a side-loaded inputs file.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatePayload {
    pub current_balance: f64,
    pub current_age: u32,
    pub life_expectancy: u32,
    pub inflation: f64,
    pub annual_return: f64,
    pub return_std: f64,
    pub distribution_type: String,
    pub num_simulations: u32,
    #[serde(default)]
    pub random_state: Option<u64>,
    pub percentiles: Vec<f64>,
    #[serde(default)]
    pub income_sources: Vec<Source>,
    #[serde(default)]
    pub spending_sources: Vec<Source>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Turns a payload into a config the core will accept, or says why not.
pub fn config_from_payload(
    payload: SimulatePayload,
    max_simulations: u32,
) -> Result<SimulationConfig, SimulationError> {
    let distribution_type = payload.distribution_type.parse::<DistributionType>()?;
    let config = SimulationConfig {
        current_balance: payload.current_balance,
        current_age: payload.current_age,
        life_expectancy: payload.life_expectancy,
        inflation: payload.inflation,
        annual_return: payload.annual_return,
        return_std: payload.return_std,
        distribution_type,
        num_simulations: payload.num_simulations,
        random_state: payload.random_state,
        percentiles: payload.percentiles,
        income_sources: payload.income_sources,
        spending_sources: payload.spending_sources,
    };
    config.check_simulation_limit(max_simulations)?;
    config.validate()?;
    Ok(config)
}

fn simulate(payload: SimulatePayload, max_simulations: u32) -> Result<SimulationOutput, ApiError> {
    let config = config_from_payload(payload, max_simulations)?;
    tracing::info!(
        paths = config.num_simulations,
        years = config.num_years(),
        distribution = %config.distribution_type,
        seeded = config.random_state.is_some(),
        "running simulation request"
    );
    Ok(run_simulation(&config)?)
}

pub async fn run_http_server(config: ServerConfig) -> io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        max_simulations = config.max_simulations,
        "retirement simulation API listening on http://{addr}"
    );
    tracing::info!("Local access: http://127.0.0.1:{}/api/simulate", config.port);

    axum::serve(listener, router(config)).await
}

fn router(config: ServerConfig) -> Router {
    Router::new()
        .route("/api/simulate", post(simulate_post_handler))
        .fallback(not_found_handler)
        .with_state(AppState {
            max_simulations: config.max_simulations,
        })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_post_handler(
    State(state): State<AppState>,
    payload: Result<Json<SimulatePayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => simulate_response(payload, state.max_simulations),
        Err(rejection) => ApiError::Payload(rejection.body_text()).into_response(),
    }
}

fn simulate_response(payload: SimulatePayload, max_simulations: u32) -> Response {
    match simulate(payload, max_simulations) {
        Ok(output) => json_response(StatusCode::OK, output),
        Err(err) => err.into_response(),
    }
}

/// Runs one simulation from an inputs file and writes pretty JSON results.
pub fn run_inputs_file(
    path: &Path,
    seed: Option<u64>,
    max_simulations: u32,
    output: Option<&Path>,
) -> Result<SimulationOutput, ApiError> {
    let raw = fs::read_to_string(path).map_err(|source| ApiError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut payload = serde_json::from_str::<SimulatePayload>(&raw)?;
    if seed.is_some() {
        payload.random_state = seed;
    }

    let result = simulate(payload, max_simulations)?;
    let json = serde_json::to_string_pretty(&result).map_err(io::Error::from)?;
    match output {
        Some(out) => fs::write(out, format!("{json}\n"))?,
        None => writeln!(io::stdout().lock(), "{json}")?,
    }
    Ok(result)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn payload_from_json(json: &str) -> Result<SimulatePayload, ApiError> {
    Ok(serde_json::from_str::<SimulatePayload>(json)?)
}
