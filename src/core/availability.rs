use super::allocator::CARRY_FORWARD_YEARS;
use super::consumption::ConsumptionIndex;
use super::types::{LedgerSummary, TaxYearRecord, YearStatus, sum_amounts};

/// Allowance left in year `index` after its own use and every later claim.
pub fn remaining(index: usize, records: &[TaxYearRecord], consumption: &ConsumptionIndex) -> f64 {
    records.get(index).map_or(0.0, |record| {
        (record.allowance - record.used - consumption.consumed_by_future(index)).max(0.0)
    })
}

/// Lost means older than the carry-forward window as seen from the latest
/// year in the series, not from any consuming year.
pub fn is_lost(index: usize, latest: usize) -> bool {
    latest.saturating_sub(index) > CARRY_FORWARD_YEARS
}

pub fn year_status(
    index: usize,
    records: &[TaxYearRecord],
    consumption: &ConsumptionIndex,
) -> YearStatus {
    let latest = records.len().saturating_sub(1);
    if remaining(index, records, consumption) <= 0.0 {
        YearStatus::Exhausted
    } else if is_lost(index, latest) {
        YearStatus::Lost
    } else if index == latest {
        YearStatus::Current
    } else {
        YearStatus::Available
    }
}

pub fn summarize(records: &[TaxYearRecord], consumption: &ConsumptionIndex) -> LedgerSummary {
    let total_contributed = sum_amounts(records.iter().map(|r| r.used));
    let total_allowance_granted = sum_amounts(records.iter().map(|r| r.allowance));

    let Some(latest) = records.len().checked_sub(1) else {
        return LedgerSummary {
            total_contributed,
            total_allowance_granted,
            ..LedgerSummary::default()
        };
    };

    let total_available = sum_amounts(
        (0..=CARRY_FORWARD_YEARS)
            .filter_map(|offset| latest.checked_sub(offset))
            .map(|index| remaining(index, records, consumption)),
    );

    let total_lost = sum_amounts(
        (0..records.len())
            .filter(|&index| is_lost(index, latest))
            .map(|index| remaining(index, records, consumption)),
    );

    LedgerSummary {
        total_contributed,
        total_allowance_granted,
        total_available,
        total_lost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::allocator::allocate;
    use crate::core::schedule::{allowance_for, tax_year_label};
    use proptest::prelude::{Strategy, prop, prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn series(start: i32, used: &[f64]) -> Vec<TaxYearRecord> {
        used.iter()
            .enumerate()
            .map(|(offset, used)| {
                let year_start = start + offset as i32;
                TaxYearRecord {
                    year_start,
                    label: tax_year_label(year_start),
                    allowance: allowance_for(year_start),
                    used: *used,
                }
            })
            .collect()
    }

    fn summary_for(records: &[TaxYearRecord]) -> LedgerSummary {
        let consumption = ConsumptionIndex::build(records, &allocate(records));
        summarize(records, &consumption)
    }

    #[test]
    fn empty_series_has_zero_summary() {
        assert_eq!(summary_for(&[]), LedgerSummary::default());
    }

    #[test]
    fn lost_is_relative_to_latest_year() {
        assert!(!is_lost(2, 5));
        assert!(is_lost(1, 5));
        assert!(is_lost(0, 5));
        assert!(!is_lost(0, 3));
        assert!(!is_lost(5, 5));
    }

    #[test]
    fn six_year_scenario_summary() {
        let records = series(
            2019,
            &[10_000.0, 0.0, 40_000.0, 50_000.0, 52_000.0, 78_000.0],
        );
        let summary = summary_for(&records);
        assert_approx(summary.total_contributed, 230_000.0);
        assert_approx(summary.total_allowance_granted, 280_000.0);
        assert_approx(summary.total_available, 0.0);
        // 2019/20 keeps 30,000; 2020/21 keeps 40,000 less the 10,000 claimed.
        assert_approx(summary.total_lost, 60_000.0);
    }

    #[test]
    fn single_year_is_current_and_available() {
        let records = series(2024, &[15_000.0]);
        let consumption = ConsumptionIndex::build(&records, &allocate(&records));
        assert_eq!(year_status(0, &records, &consumption), YearStatus::Current);
        let summary = summarize(&records, &consumption);
        assert_approx(summary.total_available, 45_000.0);
        assert_approx(summary.total_lost, 0.0);
    }

    #[test]
    fn window_includes_three_prior_years_plus_latest() {
        let records = series(2018, &[0.0, 0.0, 0.0, 0.0, 0.0]);
        let consumption = ConsumptionIndex::build(&records, &allocate(&records));
        let statuses: Vec<YearStatus> = (0..records.len())
            .map(|i| year_status(i, &records, &consumption))
            .collect();
        assert_eq!(
            statuses,
            vec![
                YearStatus::Lost,
                YearStatus::Available,
                YearStatus::Available,
                YearStatus::Available,
                YearStatus::Current,
            ]
        );
        let summary = summarize(&records, &consumption);
        assert_approx(summary.total_lost, 40_000.0);
        assert_approx(summary.total_available, 40_000.0 * 4.0);
    }

    #[test]
    fn fully_consumed_year_is_exhausted_not_negative() {
        let records = series(2019, &[30_000.0, 60_000.0]);
        let consumption = ConsumptionIndex::build(&records, &allocate(&records));
        assert_approx(remaining(0, &records, &consumption), 0.0);
        assert_approx(remaining(1, &records, &consumption), 0.0);
        assert_eq!(year_status(0, &records, &consumption), YearStatus::Exhausted);
    }

    /// Contribution totals to the penny, up to 150,000.
    fn pence_amounts(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(
            (0u32..15_000_000).prop_map(|pence| f64::from(pence) / 100.0),
            len,
        )
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_available_and_lost_partition_remaining(
            used in pence_amounts(1..14)
        ) {
            let records = series(2012, &used);
            let consumption = ConsumptionIndex::build(&records, &allocate(&records));
            let summary = summarize(&records, &consumption);

            let all_remaining: f64 = (0..records.len())
                .map(|i| remaining(i, &records, &consumption))
                .sum();
            prop_assert!(summary.total_available >= 0.0);
            prop_assert!(summary.total_lost >= 0.0);
            prop_assert!(
                (summary.total_available + summary.total_lost - all_remaining).abs() <= EPS
            );
            prop_assert!(
                summary.total_available + summary.total_lost
                    <= summary.total_allowance_granted + EPS
            );
        }
    }
}
