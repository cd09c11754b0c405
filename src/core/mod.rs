mod engine;
mod income;
mod tax;
mod types;

pub use engine::{compute_monthly, compute_monthly_with, fold_annual};
pub use income::monthly_incomes_for_year;
pub use tax::{TaxSchedule, monthly_income_tax};
pub use types::{
    AnnualSummary, CalculatorConfig, Gig, GrantPhase, MonthlyCalculation, MonthlyIncome, Profile,
    Regime, SimulationMode, YearMonth,
};
