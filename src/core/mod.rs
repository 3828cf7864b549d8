mod allocator;
mod availability;
mod consumption;
mod ledger;
mod schedule;
mod series;
mod types;

pub use allocator::{CARRY_FORWARD_YEARS, allocate};
pub use availability::{is_lost, remaining, summarize, year_status};
pub use consumption::{ConsumptionIndex, claimed_from, consumed_by_future};
pub use ledger::{Ledger, ResolvedView, ViewState};
pub use schedule::{allowance_for, tax_year_label};
pub use series::{
    MAX_AMOUNT, NormalizedSeries, RawAmount, SeriesWarning, normalize, normalize_json,
    normalize_with_warnings, parse_year_key,
};
pub use types::{
    AllocationBreakdown, CarryForwardClaim, ClaimRow, ConsumerRow, LedgerSummary, TaxYearRecord,
    YearDrilldown, YearRow, YearStatus, sum_amounts,
};
