use serde_json::Value;

use super::allocator::allocate;
use super::availability::{remaining, summarize, year_status};
use super::consumption::{ConsumptionIndex, claimed_from};
use super::schedule::tax_year_label;
use super::series::{
    NormalizedSeries, RawAmount, SeriesWarning, normalize_json, normalize_with_warnings,
};
use super::types::{
    AllocationBreakdown, ClaimRow, ConsumerRow, LedgerSummary, TaxYearRecord, YearDrilldown,
    YearRow,
};
use crate::error::LedgerResult;

/// Immutable snapshot of the annual allowance ledger. Rebuilt from scratch
/// whenever the input totals change.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    records: Vec<TaxYearRecord>,
    breakdowns: Vec<AllocationBreakdown>,
    consumption: ConsumptionIndex,
    summary: LedgerSummary,
    warnings: Vec<SeriesWarning>,
}

impl Ledger {
    pub fn build(records: Vec<TaxYearRecord>) -> Self {
        Self::from_series(NormalizedSeries {
            records,
            warnings: Vec::new(),
        })
    }

    pub fn from_series(series: NormalizedSeries) -> Self {
        let NormalizedSeries { records, warnings } = series;
        let breakdowns = allocate(&records);
        let consumption = ConsumptionIndex::build(&records, &breakdowns);
        let summary = summarize(&records, &consumption);
        Self {
            records,
            breakdowns,
            consumption,
            summary,
            warnings,
        }
    }

    pub fn from_totals<I, K, A>(raw_totals: I) -> Self
    where
        I: IntoIterator<Item = (K, A)>,
        K: AsRef<str>,
        A: Into<RawAmount>,
    {
        Self::from_series(normalize_with_warnings(raw_totals))
    }

    pub fn from_json(totals: &Value) -> LedgerResult<Self> {
        normalize_json(totals).map(Self::from_series)
    }

    pub fn records(&self) -> &[TaxYearRecord] {
        &self.records
    }

    pub fn breakdowns(&self) -> &[AllocationBreakdown] {
        &self.breakdowns
    }

    pub fn summary(&self) -> LedgerSummary {
        self.summary
    }

    pub fn warnings(&self) -> &[SeriesWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn consumed_by_future(&self, index: usize) -> f64 {
        self.consumption.consumed_by_future(index)
    }

    pub fn remaining(&self, index: usize) -> f64 {
        remaining(index, &self.records, &self.consumption)
    }

    pub fn index_of(&self, year_start: i32) -> Option<usize> {
        self.records
            .binary_search_by_key(&year_start, |record| record.year_start)
            .ok()
    }

    pub fn row(&self, index: usize) -> Option<YearRow> {
        let record = self.records.get(index)?;
        let breakdown = self.breakdowns.get(index)?;
        Some(YearRow {
            year_start: record.year_start,
            label: record.label.clone(),
            allowance: record.allowance,
            used: record.used,
            current_year_portion: breakdown.current_year_portion,
            carry_forward: breakdown
                .carry_forward
                .iter()
                .map(|claim| ClaimRow {
                    from_year: claim.from_year,
                    from_label: tax_year_label(claim.from_year),
                    amount: claim.amount,
                })
                .collect(),
            consumed_by_future: self.consumed_by_future(index),
            remaining: self.remaining(index),
            status: year_status(index, &self.records, &self.consumption),
        })
    }

    pub fn rows(&self) -> Vec<YearRow> {
        (0..self.len()).filter_map(|index| self.row(index)).collect()
    }

    /// Later years that drew on year `index`, in ascending year order.
    pub fn consumers_of(&self, index: usize) -> Vec<ConsumerRow> {
        let Some(source) = self.records.get(index) else {
            return Vec::new();
        };
        self.records
            .iter()
            .zip(&self.breakdowns)
            .skip(index + 1)
            .filter_map(|(record, breakdown)| {
                let amount = claimed_from(source.year_start, std::slice::from_ref(breakdown));
                (amount > 0.0).then(|| ConsumerRow {
                    year_start: record.year_start,
                    label: record.label.clone(),
                    amount,
                })
            })
            .collect()
    }

    pub fn drilldown(&self, index: usize) -> Option<YearDrilldown> {
        Some(YearDrilldown {
            index,
            row: self.row(index)?,
            consumed_by: self.consumers_of(index),
        })
    }
}

/// Presentation state for a ledger view. Owned by the view layer and resolved
/// against an already-built ledger.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ViewState {
    #[default]
    Overview,
    Drilldown(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedView {
    Overview {
        years: Vec<YearRow>,
        summary: LedgerSummary,
    },
    Drilldown(YearDrilldown),
}

impl ViewState {
    /// Falls back to the overview when the selected year no longer exists,
    /// e.g. after a rebuild with fewer years.
    pub fn resolve(self, ledger: &Ledger) -> ResolvedView {
        match self {
            ViewState::Drilldown(index) => match ledger.drilldown(index) {
                Some(detail) => ResolvedView::Drilldown(detail),
                None => ViewState::Overview.resolve(ledger),
            },
            ViewState::Overview => ResolvedView::Overview {
                years: ledger.rows(),
                summary: ledger.summary(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::YearStatus;
    use serde_json::json;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn six_year_ledger() -> Ledger {
        Ledger::from_totals(vec![
            ("2019/20", 10_000.0),
            ("2020/21", 0.0),
            ("2021/22", 40_000.0),
            ("2022/23", 50_000.0),
            ("2023/24", 52_000.0),
            ("2024/25", 78_000.0),
        ])
    }

    #[test]
    fn rows_expose_claims_with_source_labels() {
        let ledger = six_year_ledger();
        let rows = ledger.rows();
        assert_eq!(rows.len(), 6);

        let row = &rows[3];
        assert_eq!(row.label, "2022/23");
        assert_eq!(row.carry_forward.len(), 1);
        assert_eq!(row.carry_forward[0].from_label, "2020/21");
        assert_approx(row.carry_forward[0].amount, 10_000.0);

        assert_approx(rows[1].consumed_by_future, 10_000.0);
        assert_approx(rows[1].remaining, 30_000.0);
        assert_eq!(rows[1].status, YearStatus::Lost);
        assert_eq!(rows[4].status, YearStatus::Exhausted);
    }

    #[test]
    fn row_values_match_summary_totals() {
        let ledger = six_year_ledger();
        let lost: f64 = ledger
            .rows()
            .iter()
            .filter(|row| row.status == YearStatus::Lost)
            .map(|row| row.remaining)
            .sum();
        assert_approx(lost, ledger.summary().total_lost);
    }

    #[test]
    fn drilldown_lists_consumers() {
        let ledger = six_year_ledger();
        let index = ledger.index_of(2023).expect("2023 is present");
        let detail = ledger.drilldown(index).expect("drilldown exists");
        assert_eq!(detail.row.label, "2023/24");
        assert_eq!(
            detail.consumed_by,
            vec![ConsumerRow {
                year_start: 2024,
                label: "2024/25".to_string(),
                amount: 8_000.0,
            }]
        );
        assert!(ledger.drilldown(99).is_none());
    }

    #[test]
    fn view_state_falls_back_to_overview() {
        let ledger = six_year_ledger();
        match ViewState::Drilldown(42).resolve(&ledger) {
            ResolvedView::Overview { years, summary } => {
                assert_eq!(years.len(), 6);
                assert_eq!(summary, ledger.summary());
            }
            other => panic!("expected overview, got {other:?}"),
        }
        assert!(matches!(
            ViewState::Drilldown(1).resolve(&ledger),
            ResolvedView::Drilldown(YearDrilldown { index: 1, .. })
        ));
    }

    #[test]
    fn rebuild_from_json_matches_totals() {
        let value = json!({
            "2024/25": 78000,
            "2019": 10000,
            "2020/21": 0,
            "2021/22": "40000",
            "2022/23": 50000,
            "2023/24": 52000
        });
        let ledger = Ledger::from_json(&value).expect("valid mapping");
        assert_eq!(ledger.breakdowns(), six_year_ledger().breakdowns());
        assert_eq!(ledger.summary(), six_year_ledger().summary());
    }

    #[test]
    fn huge_amounts_keep_totals_finite() {
        let ledger = Ledger::from_totals(vec![("2022/23", f64::MAX), ("2023/24", f64::MAX)]);
        let summary = ledger.summary();
        assert!(summary.total_contributed.is_finite());
        assert_eq!(ledger.warnings().len(), 2);

        let json = serde_json::to_string(&summary).expect("summary should serialize");
        assert!(!json.contains("null"), "non-finite total in {json}");
    }

    #[test]
    fn empty_ledger_has_no_rows() {
        let ledger = Ledger::build(Vec::new());
        assert!(ledger.is_empty());
        assert!(ledger.rows().is_empty());
        assert_eq!(ledger.summary(), LedgerSummary::default());
        assert!(matches!(
            ViewState::default().resolve(&ledger),
            ResolvedView::Overview { .. }
        ));
    }
}
