/// Four-band progressive income tax schedule for one tax year.
///
/// Each rate applies only to the slice of taxable income inside its band,
/// so the resulting tax is continuous at every band limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxSchedule {
    pub first_band_limit: f64,
    pub second_band_limit: f64,
    pub third_band_limit: f64,
    pub first_band_rate: f64,
    pub second_band_rate: f64,
    pub third_band_rate: f64,
    pub top_rate: f64,
}

impl Default for TaxSchedule {
    fn default() -> Self {
        Self {
            first_band_limit: 11_310.0,
            second_band_limit: 63_515.0,
            third_band_limit: 277_825.0,
            first_band_rate: 0.14,
            second_band_rate: 0.24,
            third_band_rate: 0.42,
            top_rate: 0.45,
        }
    }
}

impl TaxSchedule {
    pub fn annual_tax(&self, taxable_income: f64) -> f64 {
        let taxable = taxable_income.max(0.0);

        let first_width = self.first_band_limit.max(0.0);
        let second_width = (self.second_band_limit - self.first_band_limit).max(0.0);
        let third_width = (self.third_band_limit - self.second_band_limit).max(0.0);

        let first = taxable.min(first_width);
        let second = (taxable - first).min(second_width).max(0.0);
        let third = (taxable - first - second).min(third_width).max(0.0);
        let top = (taxable - first - second - third).max(0.0);

        first * self.first_band_rate
            + second * self.second_band_rate
            + third * self.third_band_rate
            + top * self.top_rate
    }
}

/// Monthly income tax for one month's earnings.
///
/// The month is annualized flat (`income × 12`) before the allowance is
/// subtracted, and the annual tax is spread evenly over twelve months.
pub fn monthly_income_tax(monthly_income: f64, tax_free_allowance: f64, schedule: &TaxSchedule) -> f64 {
    let annual_income = monthly_income * 12.0;
    let taxable_income = (annual_income - tax_free_allowance).max(0.0);
    schedule.annual_tax(taxable_income) / 12.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn zero_taxable_income_owes_nothing() {
        let schedule = TaxSchedule::default();
        assert_approx(schedule.annual_tax(0.0), 0.0);
        assert_approx(schedule.annual_tax(-500.0), 0.0);
    }

    #[test]
    fn band_limits_accumulate_each_slice() {
        let schedule = TaxSchedule::default();
        assert_approx(schedule.annual_tax(11_310.0), 1_583.4);
        assert_approx(schedule.annual_tax(63_515.0), 14_112.6);
        assert_approx(schedule.annual_tax(277_825.0), 104_122.8);
        assert_approx(schedule.annual_tax(300_000.0), 114_101.55);
    }

    #[test]
    fn income_spanning_first_two_bands() {
        let schedule = TaxSchedule::default();
        assert_approx(schedule.annual_tax(11_904.0), 1_725.96);
    }

    #[test]
    fn monthly_tax_annualizes_flat_and_spreads_over_twelve() {
        let schedule = TaxSchedule::default();
        assert_approx(monthly_income_tax(2_000.0, 12_096.0, &schedule), 143.83);
        assert_approx(monthly_income_tax(1_000.0, 12_096.0, &schedule), 0.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_tax_is_monotone_and_bounded_by_top_rate(
            low in 0u32..400_000,
            delta in 0u32..50_000
        ) {
            let schedule = TaxSchedule::default();
            let low = low as f64;
            let high = low + delta as f64;
            let low_tax = schedule.annual_tax(low);
            let high_tax = schedule.annual_tax(high);

            prop_assert!(low_tax >= 0.0);
            prop_assert!(high_tax + EPS >= low_tax);
            prop_assert!(high_tax - low_tax <= (high - low) * schedule.top_rate + EPS);
            prop_assert!(low_tax <= low * schedule.top_rate + EPS);
        }

        #[test]
        fn prop_tax_is_continuous_at_band_limits(offset_cents in 1u32..100) {
            let schedule = TaxSchedule::default();
            let offset = offset_cents as f64 / 100.0;
            for limit in [
                schedule.first_band_limit,
                schedule.second_band_limit,
                schedule.third_band_limit,
            ] {
                let below = schedule.annual_tax(limit - offset);
                let above = schedule.annual_tax(limit + offset);
                prop_assert!((above - below).abs() <= 2.0 * offset * schedule.top_rate + EPS);
            }
        }
    }
}
