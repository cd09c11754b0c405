use chrono::NaiveDate;

use super::tax::monthly_income_tax;
use super::types::{
    AnnualSummary, CalculatorConfig, GrantPhase, MonthlyCalculation, MonthlyIncome, Profile,
    Regime, YearMonth,
};

/// Computes one itemized calculation per month using the default 2025 constants.
pub fn compute_monthly(incomes: &[MonthlyIncome], profile: &Profile) -> Vec<MonthlyCalculation> {
    compute_monthly_with(incomes, profile, &CalculatorConfig::default())
}

pub fn compute_monthly_with(
    incomes: &[MonthlyIncome],
    profile: &Profile,
    config: &CalculatorConfig,
) -> Vec<MonthlyCalculation> {
    let regime = profile.regime();
    incomes
        .iter()
        .map(|observation| {
            tracing::debug!(
                month = %observation.month,
                income = observation.income,
                gig_days = observation.gig_days,
                ?regime,
                "computing monthly contributions"
            );
            let mut calc = MonthlyCalculation::zeroed(observation.month, observation.income);
            match regime {
                Regime::StandardBusiness => {
                    apply_standard_business(&mut calc, observation.income, profile, config)
                }
                Regime::BenefitRecipient { monthly_benefit } => apply_benefit_recipient(
                    &mut calc,
                    observation,
                    monthly_benefit,
                    profile,
                    config,
                ),
                Regime::StartupGrant {
                    monthly_benefit,
                    start,
                    phase,
                } => apply_startup_grant(
                    &mut calc,
                    observation,
                    GrantTerms {
                        monthly_benefit,
                        start,
                        phase,
                    },
                    profile,
                    config,
                ),
            }
            calc
        })
        .collect()
}

pub fn fold_annual(months: &[MonthlyCalculation]) -> AnnualSummary {
    months
        .iter()
        .fold(AnnualSummary::default(), |acc, month| acc.with_month(month))
}

impl AnnualSummary {
    fn with_month(self, month: &MonthlyCalculation) -> Self {
        Self {
            total_gross_income: self.total_gross_income + month.gross_income,
            total_health_insurance: self.total_health_insurance + month.health_insurance,
            total_pension: self.total_pension + month.pension,
            total_nursing_care: self.total_nursing_care + month.nursing_care,
            total_income_tax: self.total_income_tax + month.income_tax,
            total_alg_deduction: self.total_alg_deduction + month.alg_deduction.unwrap_or(0.0),
            total_alg_received: self.total_alg_received + month.alg_received.unwrap_or(0.0),
            total_gruendungszuschuss: self.total_gruendungszuschuss
                + month.gruendungszuschuss_amount.unwrap_or(0.0),
            total_net_income: self.total_net_income + month.net_income,
            total_contributions: self.total_contributions + month.total_contributions,
        }
    }
}

// The contribution fund pays the other half for eligible profiles.
fn contribution_share(profile: &Profile) -> f64 {
    if profile.fund_eligible { 0.5 } else { 1.0 }
}

fn apply_standard_business(
    calc: &mut MonthlyCalculation,
    income: f64,
    profile: &Profile,
    config: &CalculatorConfig,
) {
    let share = contribution_share(profile);
    calc.health_insurance = income * (profile.health_insurance_rate / 100.0) * share;
    calc.pension = income * (profile.pension_rate / 100.0) * share;
    calc.nursing_care = income * (profile.nursing_care_rate / 100.0) * share;
    calc.income_tax = monthly_income_tax(income, profile.tax_free_allowance, &config.tax);

    calc.total_contributions =
        calc.health_insurance + calc.pension + calc.nursing_care + calc.income_tax;
    calc.net_income = income - calc.total_contributions;
}

fn apply_benefit_recipient(
    calc: &mut MonthlyCalculation,
    observation: &MonthlyIncome,
    monthly_benefit: f64,
    profile: &Profile,
    config: &CalculatorConfig,
) {
    let income = observation.income;

    if observation.gig_days == 0 {
        // Fully registered: the agency covers insurance, only excess income reduces the benefit.
        let excess_income = (income - config.benefit_exempt_amount).max(0.0);
        let deduction = excess_income.min(monthly_benefit);
        let received = monthly_benefit - deduction;

        calc.alg_deduction = Some(deduction);
        calc.alg_received = Some(received);
        calc.health_insurance = 0.0;
        calc.pension = 0.0;
        calc.nursing_care = 0.0;
        calc.income_tax = 0.0;
        calc.total_contributions = 0.0;
        calc.net_income = income + received;
        return;
    }

    let days_in_month = observation.month.days_in_month() as f64;
    let gig_days = observation.gig_days as f64;
    // Not clamped: more gig days than calendar days yields a negative benefit.
    let registered_days = days_in_month - gig_days;
    let prorated_benefit = monthly_benefit * registered_days / days_in_month;
    let gig_day_ratio = gig_days / days_in_month;

    let share = contribution_share(profile);
    let health_floor =
        config.minimum_monthly_health_insurance / config.health_floor_day_divisor * gig_days;
    let computed_health = income * (profile.health_insurance_rate / 100.0) * gig_day_ratio;

    calc.health_insurance = (computed_health * share).max(health_floor * share);
    calc.pension = income * (profile.pension_rate / 100.0) * gig_day_ratio * share;
    calc.nursing_care = income * (profile.nursing_care_rate / 100.0) * gig_day_ratio * share;
    calc.income_tax =
        monthly_income_tax(income, profile.tax_free_allowance, &config.tax) * gig_day_ratio;

    calc.alg_received = Some(prorated_benefit);
    calc.alg_deduction = Some(0.0);
    calc.total_contributions =
        calc.health_insurance + calc.pension + calc.nursing_care + calc.income_tax;
    calc.net_income = income - calc.total_contributions + prorated_benefit;
}

#[derive(Debug, Clone, Copy)]
struct GrantTerms {
    monthly_benefit: f64,
    start: Option<NaiveDate>,
    phase: Option<GrantPhase>,
}

impl GrantTerms {
    fn amount_for(self, month: YearMonth, config: &CalculatorConfig) -> Option<f64> {
        let months_since_start = month.months_since(YearMonth::from(self.start?));
        if (0..config.startup_grant_first_phase_months).contains(&months_since_start) {
            Some(self.monthly_benefit + config.startup_grant_bonus)
        } else if (config.startup_grant_first_phase_months..config.startup_grant_total_months)
            .contains(&months_since_start)
            && self.phase == Some(GrantPhase::Two)
        {
            Some(config.startup_grant_bonus)
        } else {
            None
        }
    }
}

fn apply_startup_grant(
    calc: &mut MonthlyCalculation,
    observation: &MonthlyIncome,
    terms: GrantTerms,
    profile: &Profile,
    config: &CalculatorConfig,
) {
    apply_standard_business(calc, observation.income, profile, config);

    if let Some(grant) = terms.amount_for(observation.month, config) {
        calc.gruendungszuschuss_amount = Some(grant);
        calc.net_income += grant;
    }
}
