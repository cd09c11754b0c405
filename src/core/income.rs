use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};

use super::types::{Gig, MonthlyIncome, YearMonth};

#[derive(Default)]
struct MonthBucket {
    income: f64,
    dates: BTreeSet<NaiveDate>,
}

/// Groups a user's gigs into the twelve monthly observations of `year`.
///
/// Gigs dated outside the year are ignored. Every month is present in the
/// output, January first, even when it has no gigs.
pub fn monthly_incomes_for_year(gigs: &[Gig], year: i32) -> Vec<MonthlyIncome> {
    let mut buckets: BTreeMap<u32, MonthBucket> = BTreeMap::new();
    for gig in gigs.iter().filter(|gig| gig.date.year() == year) {
        let bucket = buckets.entry(gig.date.month()).or_default();
        bucket.income += gig.price;
        bucket.dates.insert(gig.date);
    }

    (1..=12)
        .filter_map(|month| YearMonth::new(year, month))
        .map(|month| {
            let (income, gig_days) = buckets
                .get(&month.month())
                .map(|bucket| (bucket.income, bucket.dates.len() as u32))
                .unwrap_or((0.0, 0));
            MonthlyIncome {
                month,
                income,
                gig_days,
            }
        })
        .collect()
}
