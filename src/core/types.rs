use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, de};

use super::tax::TaxSchedule;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimulationMode {
    #[serde(alias = "kleinunternehmer")]
    StandardBusiness,
    #[serde(alias = "alg")]
    BenefitRecipient,
    #[serde(alias = "gruendungszuschuss")]
    StartupGrant,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GrantPhase {
    One,
    Two,
}

impl TryFrom<u8> for GrantPhase {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(GrantPhase::One),
            2 => Ok(GrantPhase::Two),
            other => Err(format!("startup grant phase must be 1 or 2, got {other}")),
        }
    }
}

impl From<GrantPhase> for u8 {
    fn from(value: GrantPhase) -> Self {
        match value {
            GrantPhase::One => 1,
            GrantPhase::Two => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub simulation_mode: SimulationMode,
    pub annual_income_estimate: f64,
    #[serde(alias = "monthly_alg_amount")]
    pub monthly_benefit_amount: Option<f64>,
    #[serde(alias = "gruendungszuschuss_start_date")]
    pub startup_grant_start_date: Option<NaiveDate>,
    #[serde(alias = "gruendungszuschuss_phase")]
    pub startup_grant_phase: Option<GrantPhase>,
    #[serde(alias = "ksk_eligible", deserialize_with = "flag_from_bool_or_int")]
    pub fund_eligible: bool,
    pub health_insurance_rate: f64,
    pub pension_rate: f64,
    pub nursing_care_rate: f64,
    pub tax_free_allowance: f64,
}

// Stored profile rows keep the flag as an INTEGER column.
fn flag_from_bool_or_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Int(0) => Ok(false),
        Flag::Int(1) => Ok(true),
        Flag::Int(other) => Err(de::Error::custom(format!(
            "fund_eligible must be a boolean, 0 or 1, got {other}"
        ))),
    }
}

impl Profile {
    /// Profile handed to a freshly created user: standard business taxation,
    /// fund-eligible, statutory rates for 2025.
    pub fn new_user_default() -> Self {
        Self {
            simulation_mode: SimulationMode::StandardBusiness,
            annual_income_estimate: 0.0,
            monthly_benefit_amount: None,
            startup_grant_start_date: None,
            startup_grant_phase: None,
            fund_eligible: true,
            health_insurance_rate: 14.6,
            pension_rate: 18.6,
            nursing_care_rate: 3.05,
            tax_free_allowance: 12_096.0,
        }
    }

    pub fn regime(&self) -> Regime {
        let monthly_benefit = self.monthly_benefit_amount.unwrap_or(0.0);
        match self.simulation_mode {
            SimulationMode::StandardBusiness => Regime::StandardBusiness,
            SimulationMode::BenefitRecipient => Regime::BenefitRecipient { monthly_benefit },
            SimulationMode::StartupGrant => Regime::StartupGrant {
                monthly_benefit,
                start: self.startup_grant_start_date,
                phase: self.startup_grant_phase,
            },
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new_user_default()
    }
}

/// Regime-specific view of a profile, carrying only what each calculator reads.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Regime {
    StandardBusiness,
    BenefitRecipient {
        monthly_benefit: f64,
    },
    StartupGrant {
        monthly_benefit: f64,
        start: Option<NaiveDate>,
        phase: Option<GrantPhase>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    pub fn days_in_month(self) -> u32 {
        match self.month {
            4 | 6 | 9 | 11 => 30,
            2 if NaiveDate::from_yo_opt(self.year, 366).is_some() => 29,
            2 => 28,
            _ => 31,
        }
    }

    /// Whole calendar months from `start` to `self`; negative when `self` is earlier.
    pub fn months_since(self, start: YearMonth) -> i32 {
        (self.year - start.year) * 12 + (self.month as i32 - start.month as i32)
    }
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid month label '{s}', expected YYYY-MM");
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        YearMonth::new(year, month).ok_or_else(invalid)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gig {
    pub date: NaiveDate,
    #[serde(default)]
    pub title: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyIncome {
    pub month: YearMonth,
    pub income: f64,
    #[serde(default)]
    pub gig_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCalculation {
    pub month: YearMonth,
    pub gross_income: f64,
    pub health_insurance: f64,
    pub pension: f64,
    pub nursing_care: f64,
    pub income_tax: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg_deduction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg_received: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gruendungszuschuss_amount: Option<f64>,
    pub net_income: f64,
    pub total_contributions: f64,
}

impl MonthlyCalculation {
    pub fn zeroed(month: YearMonth, income: f64) -> Self {
        Self {
            month,
            gross_income: income,
            health_insurance: 0.0,
            pension: 0.0,
            nursing_care: 0.0,
            income_tax: 0.0,
            alg_deduction: None,
            alg_received: None,
            gruendungszuschuss_amount: None,
            net_income: income,
            total_contributions: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AnnualSummary {
    pub total_gross_income: f64,
    pub total_health_insurance: f64,
    pub total_pension: f64,
    pub total_nursing_care: f64,
    pub total_income_tax: f64,
    pub total_alg_deduction: f64,
    pub total_alg_received: f64,
    pub total_gruendungszuschuss: f64,
    pub total_net_income: f64,
    pub total_contributions: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalculatorConfig {
    pub tax: TaxSchedule,
    pub benefit_exempt_amount: f64,
    pub minimum_monthly_health_insurance: f64,
    pub health_floor_day_divisor: f64,
    pub startup_grant_bonus: f64,
    pub startup_grant_first_phase_months: i32,
    pub startup_grant_total_months: i32,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            tax: TaxSchedule::default(),
            benefit_exempt_amount: 165.0,
            minimum_monthly_health_insurance: 213.0,
            health_floor_day_divisor: 30.0,
            startup_grant_bonus: 300.0,
            startup_grant_first_phase_months: 6,
            startup_grant_total_months: 15,
        }
    }
}
