use super::types::{AllocationBreakdown, TaxYearRecord, sum_amounts};

/// Sum of carry-forward claims in `breakdowns` that draw on `year_start`.
///
/// Both the allocator (claims already made by earlier consumers) and the
/// consumption index (claims made by all later years) go through this.
pub fn claimed_from(year_start: i32, breakdowns: &[AllocationBreakdown]) -> f64 {
    sum_amounts(
        breakdowns
            .iter()
            .flat_map(|breakdown| breakdown.carry_forward.iter())
            .filter(|claim| claim.from_year == year_start)
            .map(|claim| claim.amount),
    )
}

/// How much of year `index`'s unused allowance later years have claimed.
pub fn consumed_by_future(
    index: usize,
    records: &[TaxYearRecord],
    breakdowns: &[AllocationBreakdown],
) -> f64 {
    let Some(record) = records.get(index) else {
        return 0.0;
    };
    let later = breakdowns.get(index + 1..).unwrap_or_default();
    claimed_from(record.year_start, later)
}

/// Consumed-by-future values for every year, computed once per ledger build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsumptionIndex {
    consumed: Vec<f64>,
}

impl ConsumptionIndex {
    pub fn build(records: &[TaxYearRecord], breakdowns: &[AllocationBreakdown]) -> Self {
        let consumed = (0..records.len())
            .map(|index| consumed_by_future(index, records, breakdowns))
            .collect();
        Self { consumed }
    }

    pub fn consumed_by_future(&self, index: usize) -> f64 {
        self.consumed.get(index).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}
