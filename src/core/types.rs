use serde::Serialize;

/// Sums currency amounts starting from +0.0, so an empty total never renders
/// as "-0".
pub fn sum_amounts<I: IntoIterator<Item = f64>>(amounts: I) -> f64 {
    amounts.into_iter().fold(0.0, |total, amount| total + amount)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxYearRecord {
    pub year_start: i32,
    pub label: String,
    pub allowance: f64,
    pub used: f64,
}

impl TaxYearRecord {
    /// Unused allowance before any later year claims it. Never negative.
    pub fn headroom(&self) -> f64 {
        (self.allowance - self.used).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarryForwardClaim {
    pub from_year: i32,
    pub amount: f64,
}

/// How one year's contributions were attributed. Aligned by index with the
/// record list it was computed from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationBreakdown {
    pub current_year_portion: f64,
    pub carry_forward: Vec<CarryForwardClaim>,
}

impl AllocationBreakdown {
    pub fn carried_forward_total(&self) -> f64 {
        sum_amounts(self.carry_forward.iter().map(|claim| claim.amount))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub total_contributed: f64,
    pub total_allowance_granted: f64,
    pub total_available: f64,
    pub total_lost: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum YearStatus {
    Current,
    Available,
    Lost,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRow {
    pub from_year: i32,
    pub from_label: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRow {
    pub year_start: i32,
    pub label: String,
    pub allowance: f64,
    pub used: f64,
    pub current_year_portion: f64,
    pub carry_forward: Vec<ClaimRow>,
    pub consumed_by_future: f64,
    pub remaining: f64,
    pub status: YearStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerRow {
    pub year_start: i32,
    pub label: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearDrilldown {
    pub index: usize,
    pub row: YearRow,
    pub consumed_by: Vec<ConsumerRow>,
}
