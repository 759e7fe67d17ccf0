use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    PercentileSummary, SimulationConfig, SimulationError, Strategy, TrialRunner, build_pool,
    strategy_seed,
};

pub const DEFAULT_PRINCIPAL: f64 = 100_000.0;
pub const DEFAULT_YEARS: u32 = 20;
pub const DEFAULT_TRIALS: u32 = 10_000;
pub const DEFAULT_INFLATION_RATE: f64 = 3.5;

const AGGRESSIVE_LABEL: &str = "Aggressive";
const AGGRESSIVE_MEAN: f64 = 9.4324;
const AGGRESSIVE_STD_DEV: f64 = 15.675;
const CONSERVATIVE_LABEL: &str = "Conservative";
const CONSERVATIVE_MEAN: f64 = 6.189;
const CONSERVATIVE_STD_DEV: f64 = 6.3438;

// Bounds on HTTP request size; each request holds a blocking worker until done.
const MAX_API_TRIALS: u32 = 1_000_000;
const MAX_API_YEARS: u32 = 200;
const MAX_API_STRATEGIES: usize = 16;

pub fn default_strategies() -> Vec<Strategy> {
    vec![
        Strategy::new(AGGRESSIVE_LABEL, AGGRESSIVE_MEAN, AGGRESSIVE_STD_DEV),
        Strategy::new(CONSERVATIVE_LABEL, CONSERVATIVE_MEAN, CONSERVATIVE_STD_DEV),
    ]
}

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Monte Carlo projection of inflation-adjusted savings under competing return profiles"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Simulate the aggressive and conservative strategies and print their percentiles
    Compare(CompareArgs),
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

impl Default for Command {
    fn default() -> Self {
        Self::Compare(CompareArgs::default())
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct CompareArgs {
    #[arg(long, default_value_t = DEFAULT_PRINCIPAL, help = "Starting principal")]
    pub principal: f64,
    #[arg(long, default_value_t = DEFAULT_YEARS, help = "Investment horizon in years")]
    pub years: u32,
    #[arg(long, default_value_t = DEFAULT_TRIALS, help = "Monte Carlo trials per strategy")]
    pub trials: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_INFLATION_RATE,
        help = "Flat annual inflation in percent"
    )]
    pub inflation_rate: f64,
    #[arg(
        long,
        default_value_t = AGGRESSIVE_MEAN,
        help = "Aggressive strategy mean annual return in percent"
    )]
    pub aggressive_mean: f64,
    #[arg(
        long,
        default_value_t = AGGRESSIVE_STD_DEV,
        help = "Aggressive strategy annual return standard deviation in percent"
    )]
    pub aggressive_std_dev: f64,
    #[arg(
        long,
        default_value_t = CONSERVATIVE_MEAN,
        help = "Conservative strategy mean annual return in percent"
    )]
    pub conservative_mean: f64,
    #[arg(
        long,
        default_value_t = CONSERVATIVE_STD_DEV,
        help = "Conservative strategy annual return standard deviation in percent"
    )]
    pub conservative_std_dev: f64,
    #[arg(long, help = "Seed for reproducible runs; omitted means OS entropy")]
    pub seed: Option<u64>,
    #[arg(long, help = "Spread trials over worker threads")]
    pub parallel: bool,
    #[arg(
        long,
        default_value_t = 0,
        help = "Worker threads for --parallel; 0 uses one per core"
    )]
    pub threads: usize,
    #[arg(long, help = "Print summaries as JSON instead of text")]
    pub json: bool,
}

impl Default for CompareArgs {
    fn default() -> Self {
        Self {
            principal: DEFAULT_PRINCIPAL,
            years: DEFAULT_YEARS,
            trials: DEFAULT_TRIALS,
            inflation_rate: DEFAULT_INFLATION_RATE,
            aggressive_mean: AGGRESSIVE_MEAN,
            aggressive_std_dev: AGGRESSIVE_STD_DEV,
            conservative_mean: CONSERVATIVE_MEAN,
            conservative_std_dev: CONSERVATIVE_STD_DEV,
            seed: None,
            parallel: false,
            threads: 0,
            json: false,
        }
    }
}

impl CompareArgs {
    fn configs(&self) -> Result<Vec<SimulationConfig>, SimulationError> {
        let strategies = [
            Strategy::new(
                AGGRESSIVE_LABEL,
                self.aggressive_mean,
                self.aggressive_std_dev,
            ),
            Strategy::new(
                CONSERVATIVE_LABEL,
                self.conservative_mean,
                self.conservative_std_dev,
            ),
        ];
        strategies
            .into_iter()
            .map(|strategy| {
                SimulationConfig::new(
                    self.principal,
                    self.years,
                    strategy,
                    self.inflation_rate,
                    self.trials,
                )
            })
            .collect()
    }

    fn options(&self) -> RunOptions {
        RunOptions {
            seed: self.seed,
            parallel: self.parallel,
            threads: self.threads,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub seed: Option<u64>,
    pub parallel: bool,
    pub threads: usize,
}

/// Runs each config in turn and returns the summaries in the same order.
///
/// With a seed, strategy `i` gets its own stream derived from it, so two
/// strategies with identical parameters still draw independent samples.
pub fn run_strategies(
    configs: &[SimulationConfig],
    options: RunOptions,
) -> Result<Vec<PercentileSummary>, SimulationError> {
    let pool = match (options.parallel, options.threads) {
        (true, threads) if threads > 0 => Some(build_pool(threads)?),
        _ => None,
    };

    let mut summaries = Vec::with_capacity(configs.len());
    for (index, config) in configs.iter().enumerate() {
        let runner = TrialRunner::new(config.clone())?;
        let seed = options.seed.map(|s| strategy_seed(s, index as u32));
        let started = Instant::now();

        let summary = if options.parallel {
            let base_seed = seed.unwrap_or_else(rand::random);
            match &pool {
                Some(pool) => pool.install(|| runner.run_parallel(base_seed)),
                None => runner.run_parallel(base_seed),
            }
        } else {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            runner.run(&mut rng)
        };

        info!(
            label = config.label(),
            trials = config.trial_count(),
            years = config.years(),
            parallel = options.parallel,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "strategy simulated"
        );
        summaries.push(summary);
    }

    Ok(summaries)
}

pub fn format_report(summary: &PercentileSummary) -> String {
    format!(
        "Results for {} strategy\n  10th percentile: {:.2}\n  50th percentile: {:.2}\n  90th percentile: {:.2}\n",
        summary.label, summary.p10, summary.p50, summary.p90
    )
}

/// Runs the two-strategy comparison and renders it as text or JSON.
pub fn run_compare(args: &CompareArgs) -> anyhow::Result<String> {
    let configs = args.configs()?;
    let summaries = run_strategies(&configs, args.options())?;

    if args.json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(&summaries)?));
    }

    Ok(summaries
        .iter()
        .map(|summary| format!("{}\n", format_report(summary)))
        .collect())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    label: Option<String>,
    principal: Option<f64>,
    years: Option<u32>,
    mean_return: Option<f64>,
    return_std_dev: Option<f64>,
    inflation_rate: Option<f64>,
    trials: Option<u32>,
    seed: Option<u64>,
    parallel: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ComparePayload {
    principal: Option<f64>,
    years: Option<u32>,
    inflation_rate: Option<f64>,
    trials: Option<u32>,
    seed: Option<u64>,
    parallel: Option<bool>,
    strategies: Vec<StrategyPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StrategyPayload {
    label: String,
    mean_return: f64,
    return_std_dev: f64,
}

#[derive(Debug)]
struct ApiRequest {
    configs: Vec<SimulationConfig>,
    options: RunOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    #[serde(flatten)]
    summary: PercentileSummary,
    trials: u32,
    years: u32,
}

#[derive(Debug, Serialize)]
struct CompareResponse {
    results: Vec<SimulateResponse>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn check_api_limit(field: &'static str, value: usize, max: usize) -> Result<(), SimulationError> {
    if value > max {
        return Err(SimulationError::InvalidArgument {
            field,
            message: format!("must be <= {max}"),
        });
    }
    Ok(())
}

fn check_api_run_size(years: u32, trials: u32) -> Result<(), SimulationError> {
    check_api_limit("years", years as usize, MAX_API_YEARS as usize)?;
    check_api_limit("trials", trials as usize, MAX_API_TRIALS as usize)
}

fn api_request_from_simulate(payload: SimulatePayload) -> Result<ApiRequest, SimulationError> {
    let strategy = Strategy::new(
        payload.label.unwrap_or_else(|| AGGRESSIVE_LABEL.to_string()),
        payload.mean_return.unwrap_or(AGGRESSIVE_MEAN),
        payload.return_std_dev.unwrap_or(AGGRESSIVE_STD_DEV),
    );
    let years = payload.years.unwrap_or(DEFAULT_YEARS);
    let trials = payload.trials.unwrap_or(DEFAULT_TRIALS);
    check_api_run_size(years, trials)?;

    let config = SimulationConfig::new(
        payload.principal.unwrap_or(DEFAULT_PRINCIPAL),
        years,
        strategy,
        payload.inflation_rate.unwrap_or(DEFAULT_INFLATION_RATE),
        trials,
    )?;

    Ok(ApiRequest {
        configs: vec![config],
        options: RunOptions {
            seed: payload.seed,
            parallel: payload.parallel.unwrap_or(false),
            threads: 0,
        },
    })
}

fn api_request_from_compare(payload: ComparePayload) -> Result<ApiRequest, SimulationError> {
    check_api_limit("strategies", payload.strategies.len(), MAX_API_STRATEGIES)?;
    let strategies = if payload.strategies.is_empty() {
        default_strategies()
    } else {
        payload
            .strategies
            .into_iter()
            .map(|s| Strategy::new(s.label, s.mean_return, s.return_std_dev))
            .collect()
    };

    let principal = payload.principal.unwrap_or(DEFAULT_PRINCIPAL);
    let years = payload.years.unwrap_or(DEFAULT_YEARS);
    let inflation_rate = payload.inflation_rate.unwrap_or(DEFAULT_INFLATION_RATE);
    let trials = payload.trials.unwrap_or(DEFAULT_TRIALS);
    check_api_run_size(years, trials)?;

    let configs = strategies
        .into_iter()
        .map(|strategy| SimulationConfig::new(principal, years, strategy, inflation_rate, trials))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ApiRequest {
        configs,
        options: RunOptions {
            seed: payload.seed,
            parallel: payload.parallel.unwrap_or(false),
            threads: 0,
        },
    })
}

fn run_api_request(request: &ApiRequest) -> Result<Vec<SimulateResponse>, SimulationError> {
    let summaries = run_strategies(&request.configs, request.options)?;
    Ok(request
        .configs
        .iter()
        .zip(summaries)
        .map(|(config, summary)| SimulateResponse {
            summary,
            trials: config.trial_count(),
            years: config.years(),
        })
        .collect())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/compare", post(compare_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "nestegg HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_simulate(payload) {
        Ok(request) => request,
        Err(e) => return rejection(&e),
    };

    match execute(request).await {
        Ok(mut results) => match results.pop() {
            Some(result) => json_response(StatusCode::OK, result),
            None => error_response(StatusCode::INTERNAL_SERVER_ERROR, "no result produced"),
        },
        Err(response) => response,
    }
}

async fn compare_handler(Json(payload): Json<ComparePayload>) -> Response {
    let request = match api_request_from_compare(payload) {
        Ok(request) => request,
        Err(e) => return rejection(&e),
    };

    match execute(request).await {
        Ok(results) => json_response(StatusCode::OK, CompareResponse { results }),
        Err(response) => response,
    }
}

async fn execute(request: ApiRequest) -> Result<Vec<SimulateResponse>, Response> {
    match tokio::task::spawn_blocking(move || run_api_request(&request)).await {
        Ok(Ok(results)) => Ok(results),
        Ok(Err(e)) => Err(rejection(&e)),
        Err(e) => {
            warn!(error = %e, "simulation task failed");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "simulation task failed",
            ))
        }
    }
}

fn status_for(error: &SimulationError) -> StatusCode {
    match error {
        SimulationError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
        SimulationError::Executor { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn rejection(error: &SimulationError) -> Response {
    warn!(error = %error, "simulation request rejected");
    error_response(status_for(error), &error.to_string())
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
fn simulate_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_simulate(payload).map_err(|e| e.to_string())
}

#[cfg(test)]
fn compare_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<ComparePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_compare(payload).map_err(|e| e.to_string())
}
