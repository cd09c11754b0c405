mod error;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::core::{
    AnnualSummary, CalculatorConfig, Gig, GrantPhase, MonthlyCalculation, MonthlyIncome, Profile,
    SimulationMode, TaxSchedule, compute_monthly_with, fold_annual, monthly_incomes_for_year,
};

pub use error::ApiError;

const MAX_MONTHS: usize = 12;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliSimulationMode {
    StandardBusiness,
    BenefitRecipient,
    StartupGrant,
}

impl From<CliSimulationMode> for SimulationMode {
    fn from(value: CliSimulationMode) -> Self {
        match value {
            CliSimulationMode::StandardBusiness => SimulationMode::StandardBusiness,
            CliSimulationMode::BenefitRecipient => SimulationMode::BenefitRecipient,
            CliSimulationMode::StartupGrant => SimulationMode::StartupGrant,
        }
    }
}

impl From<SimulationMode> for CliSimulationMode {
    fn from(value: SimulationMode) -> Self {
        match value {
            SimulationMode::StandardBusiness => CliSimulationMode::StandardBusiness,
            SimulationMode::BenefitRecipient => CliSimulationMode::BenefitRecipient,
            SimulationMode::StartupGrant => CliSimulationMode::StartupGrant,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "gig-income",
    about = "Monthly and annual net income estimator for gig workers (standard business, benefit recipient, startup grant)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Calculate one year from a JSON file of gigs and print the result
    Calculate(CalculateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CalculateArgs {
    #[arg(long)]
    pub year: i32,
    #[arg(long, help = "JSON array of gigs ({date, title, price, notes})")]
    pub gigs: Option<PathBuf>,
    #[command(flatten)]
    pub profile: ProfileArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    #[arg(long, value_enum, default_value_t = CliSimulationMode::StandardBusiness)]
    pub simulation_mode: CliSimulationMode,
    #[arg(long, help = "Monthly benefit received while registered")]
    pub monthly_benefit_amount: Option<f64>,
    #[arg(long, help = "First day of the startup grant (YYYY-MM-DD)")]
    pub startup_grant_start_date: Option<NaiveDate>,
    #[arg(long, help = "Startup grant phase (1 or 2)")]
    pub startup_grant_phase: Option<u8>,
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub fund_eligible: bool,
    #[arg(long, default_value_t = 0.0)]
    pub annual_income_estimate: f64,
    #[arg(long, default_value_t = 14.6, help = "Health insurance rate in percent")]
    pub health_insurance_rate: f64,
    #[arg(long, default_value_t = 18.6, help = "Pension rate in percent")]
    pub pension_rate: f64,
    #[arg(long, default_value_t = 3.05, help = "Nursing care rate in percent")]
    pub nursing_care_rate: f64,
    #[arg(long, default_value_t = 12_096.0)]
    pub tax_free_allowance: f64,
    #[arg(long, default_value_t = 11_310.0)]
    pub first_band_limit: f64,
    #[arg(long, default_value_t = 63_515.0)]
    pub second_band_limit: f64,
    #[arg(long, default_value_t = 277_825.0)]
    pub third_band_limit: f64,
    #[arg(long, default_value_t = 14.0, help = "Rate in percent")]
    pub first_band_rate: f64,
    #[arg(long, default_value_t = 24.0, help = "Rate in percent")]
    pub second_band_rate: f64,
    #[arg(long, default_value_t = 42.0, help = "Rate in percent")]
    pub third_band_rate: f64,
    #[arg(long, default_value_t = 45.0, help = "Rate in percent")]
    pub top_rate: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CalculatePayload {
    year: Option<i32>,
    gigs: Vec<Gig>,
    monthly_income: Option<Vec<MonthlyIncome>>,

    profile: Option<Profile>,
    simulation_mode: Option<SimulationMode>,
    monthly_benefit_amount: Option<f64>,
    startup_grant_start_date: Option<NaiveDate>,
    startup_grant_phase: Option<GrantPhase>,
    fund_eligible: Option<bool>,
    annual_income_estimate: Option<f64>,
    health_insurance_rate: Option<f64>,
    pension_rate: Option<f64>,
    nursing_care_rate: Option<f64>,
    tax_free_allowance: Option<f64>,

    first_band_limit: Option<f64>,
    second_band_limit: Option<f64>,
    third_band_limit: Option<f64>,
    first_band_rate: Option<f64>,
    second_band_rate: Option<f64>,
    third_band_rate: Option<f64>,
    top_rate: Option<f64>,
}

#[derive(Debug)]
struct ApiRequest {
    profile: Profile,
    config: CalculatorConfig,
    incomes: Vec<MonthlyIncome>,
}

#[derive(Debug, Serialize)]
pub struct CalculationResponse {
    pub monthly: Vec<MonthlyCalculation>,
    pub annual: AnnualSummary,
    pub profile: Profile,
}

pub fn build_profile(args: &ProfileArgs) -> Result<Profile, String> {
    for (flag, rate) in [
        ("--health-insurance-rate", args.health_insurance_rate),
        ("--pension-rate", args.pension_rate),
        ("--nursing-care-rate", args.nursing_care_rate),
    ] {
        if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
            return Err(format!("{flag} must be between 0 and 100"));
        }
    }

    if !args.tax_free_allowance.is_finite() || args.tax_free_allowance < 0.0 {
        return Err("--tax-free-allowance must be >= 0".to_string());
    }

    if !args.annual_income_estimate.is_finite() || args.annual_income_estimate < 0.0 {
        return Err("--annual-income-estimate must be >= 0".to_string());
    }

    if let Some(benefit) = args.monthly_benefit_amount {
        if !benefit.is_finite() || benefit < 0.0 {
            return Err("--monthly-benefit-amount must be >= 0".to_string());
        }
    }

    let startup_grant_phase = args
        .startup_grant_phase
        .map(GrantPhase::try_from)
        .transpose()
        .map_err(|_| "--startup-grant-phase must be 1 or 2".to_string())?;

    Ok(Profile {
        simulation_mode: args.simulation_mode.into(),
        annual_income_estimate: args.annual_income_estimate,
        monthly_benefit_amount: args.monthly_benefit_amount,
        startup_grant_start_date: args.startup_grant_start_date,
        startup_grant_phase,
        fund_eligible: args.fund_eligible,
        health_insurance_rate: args.health_insurance_rate,
        pension_rate: args.pension_rate,
        nursing_care_rate: args.nursing_care_rate,
        tax_free_allowance: args.tax_free_allowance,
    })
}

pub fn build_calculator_config(args: &ProfileArgs) -> Result<CalculatorConfig, String> {
    let limits = [
        args.first_band_limit,
        args.second_band_limit,
        args.third_band_limit,
    ];
    if limits.iter().any(|limit| !limit.is_finite() || *limit <= 0.0) {
        return Err("tax band limits must be > 0".to_string());
    }
    if args.second_band_limit <= args.first_band_limit
        || args.third_band_limit <= args.second_band_limit
    {
        return Err(
            "--first-band-limit < --second-band-limit < --third-band-limit is required"
                .to_string(),
        );
    }

    for (flag, rate) in [
        ("--first-band-rate", args.first_band_rate),
        ("--second-band-rate", args.second_band_rate),
        ("--third-band-rate", args.third_band_rate),
        ("--top-rate", args.top_rate),
    ] {
        if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
            return Err(format!("{flag} must be between 0 and 100"));
        }
    }

    Ok(CalculatorConfig {
        tax: TaxSchedule {
            first_band_limit: args.first_band_limit,
            second_band_limit: args.second_band_limit,
            third_band_limit: args.third_band_limit,
            first_band_rate: args.first_band_rate / 100.0,
            second_band_rate: args.second_band_rate / 100.0,
            third_band_rate: args.third_band_rate / 100.0,
            top_rate: args.top_rate / 100.0,
        },
        ..CalculatorConfig::default()
    })
}

fn validate_gigs(gigs: &[Gig]) -> Result<(), String> {
    for gig in gigs {
        if !gig.price.is_finite() || gig.price < 0.0 {
            return Err(format!("gig on {} must have a price >= 0", gig.date));
        }
    }
    Ok(())
}

fn validate_monthly_incomes(incomes: &[MonthlyIncome]) -> Result<(), String> {
    if incomes.len() > MAX_MONTHS {
        return Err(format!("monthlyIncome accepts at most {MAX_MONTHS} months"));
    }
    for observation in incomes {
        if !observation.income.is_finite() || observation.income < 0.0 {
            return Err(format!("income for {} must be >= 0", observation.month));
        }
        let days_in_month = observation.month.days_in_month();
        if observation.gig_days > days_in_month {
            return Err(format!(
                "gigDays for {} must be <= {days_in_month}",
                observation.month
            ));
        }
    }
    Ok(())
}

pub fn run_cli_calculation(args: &CalculateArgs) -> anyhow::Result<CalculationResponse> {
    let gigs: Vec<Gig> = match &args.gigs {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read gigs file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid gigs JSON in {}", path.display()))?
        }
        None => Vec::new(),
    };
    validate_gigs(&gigs).map_err(anyhow::Error::msg)?;

    let profile = build_profile(&args.profile).map_err(anyhow::Error::msg)?;
    let config = build_calculator_config(&args.profile).map_err(anyhow::Error::msg)?;
    let incomes = monthly_incomes_for_year(&gigs, args.year);
    tracing::info!(year = args.year, gigs = gigs.len(), "calculating from gig file");

    Ok(build_calculation_response(profile, &config, &incomes))
}

pub fn router() -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/profiles/default", get(default_profile_handler))
        .route("/api/calculations", post(calculate_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "income simulator API listening");

    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(
        StatusCode::OK,
        serde_json::json!({
            "status": "ok",
            "message": "Income simulator API is running",
        }),
    )
}

async fn default_profile_handler() -> Response {
    json_response(StatusCode::OK, Profile::new_user_default())
}

async fn not_found_handler() -> ApiError {
    ApiError::NotFound
}

async fn calculate_handler(body: Bytes) -> Result<Response, ApiError> {
    let payload = serde_json::from_slice::<CalculatePayload>(&body).map_err(|err| {
        tracing::warn!(error = %err, "rejected malformed calculation payload");
        ApiError::Json(err)
    })?;
    let request = api_request_from_payload(payload).map_err(|msg| {
        tracing::warn!(error = %msg, "rejected calculation request");
        ApiError::BadRequest(msg)
    })?;

    tracing::info!(
        mode = ?request.profile.simulation_mode,
        months = request.incomes.len(),
        "calculating contributions"
    );
    let response = build_calculation_response(request.profile, &request.config, &request.incomes);
    Ok(json_response(StatusCode::OK, response))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, [(header::CACHE_CONTROL, "no-store")], Json(body)).into_response()
}

fn default_profile_args() -> ProfileArgs {
    ProfileArgs {
        simulation_mode: CliSimulationMode::StandardBusiness,
        monthly_benefit_amount: None,
        startup_grant_start_date: None,
        startup_grant_phase: None,
        fund_eligible: true,
        annual_income_estimate: 0.0,
        health_insurance_rate: 14.6,
        pension_rate: 18.6,
        nursing_care_rate: 3.05,
        tax_free_allowance: 12_096.0,
        first_band_limit: 11_310.0,
        second_band_limit: 63_515.0,
        third_band_limit: 277_825.0,
        first_band_rate: 14.0,
        second_band_rate: 24.0,
        third_band_rate: 42.0,
        top_rate: 45.0,
    }
}

fn profile_args_from(profile: &Profile, base: ProfileArgs) -> ProfileArgs {
    ProfileArgs {
        simulation_mode: profile.simulation_mode.into(),
        monthly_benefit_amount: profile.monthly_benefit_amount,
        startup_grant_start_date: profile.startup_grant_start_date,
        startup_grant_phase: profile.startup_grant_phase.map(u8::from),
        fund_eligible: profile.fund_eligible,
        annual_income_estimate: profile.annual_income_estimate,
        health_insurance_rate: profile.health_insurance_rate,
        pension_rate: profile.pension_rate,
        nursing_care_rate: profile.nursing_care_rate,
        tax_free_allowance: profile.tax_free_allowance,
        ..base
    }
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<CalculatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: CalculatePayload) -> Result<ApiRequest, String> {
    let mut args = match &payload.profile {
        Some(profile) => profile_args_from(profile, default_profile_args()),
        None => default_profile_args(),
    };

    if let Some(v) = payload.simulation_mode {
        args.simulation_mode = v.into();
    }
    if let Some(v) = payload.monthly_benefit_amount {
        args.monthly_benefit_amount = Some(v);
    }
    if let Some(v) = payload.startup_grant_start_date {
        args.startup_grant_start_date = Some(v);
    }
    if let Some(v) = payload.startup_grant_phase {
        args.startup_grant_phase = Some(v.into());
    }
    if let Some(v) = payload.fund_eligible {
        args.fund_eligible = v;
    }
    if let Some(v) = payload.annual_income_estimate {
        args.annual_income_estimate = v;
    }
    if let Some(v) = payload.health_insurance_rate {
        args.health_insurance_rate = v;
    }
    if let Some(v) = payload.pension_rate {
        args.pension_rate = v;
    }
    if let Some(v) = payload.nursing_care_rate {
        args.nursing_care_rate = v;
    }
    if let Some(v) = payload.tax_free_allowance {
        args.tax_free_allowance = v;
    }
    if let Some(v) = payload.first_band_limit {
        args.first_band_limit = v;
    }
    if let Some(v) = payload.second_band_limit {
        args.second_band_limit = v;
    }
    if let Some(v) = payload.third_band_limit {
        args.third_band_limit = v;
    }
    if let Some(v) = payload.first_band_rate {
        args.first_band_rate = v;
    }
    if let Some(v) = payload.second_band_rate {
        args.second_band_rate = v;
    }
    if let Some(v) = payload.third_band_rate {
        args.third_band_rate = v;
    }
    if let Some(v) = payload.top_rate {
        args.top_rate = v;
    }

    let profile = build_profile(&args)?;
    let config = build_calculator_config(&args)?;

    let incomes = match payload.monthly_income {
        Some(incomes) => {
            validate_monthly_incomes(&incomes)?;
            incomes
        }
        None => {
            let Some(year) = payload.year else {
                return Err("year is required unless monthlyIncome is given".to_string());
            };
            validate_gigs(&payload.gigs)?;
            monthly_incomes_for_year(&payload.gigs, year)
        }
    };

    Ok(ApiRequest {
        profile,
        config,
        incomes,
    })
}

fn build_calculation_response(
    profile: Profile,
    config: &CalculatorConfig,
    incomes: &[MonthlyIncome],
) -> CalculationResponse {
    let monthly = compute_monthly_with(incomes, &profile, config);
    let annual = fold_annual(&monthly);
    CalculationResponse {
        monthly,
        annual,
        profile,
    }
}
