use tracing::debug;

use super::consumption::claimed_from;
use super::types::{AllocationBreakdown, CarryForwardClaim, TaxYearRecord};

/// Number of preceding tax years whose unused allowance can be carried forward.
pub const CARRY_FORWARD_YEARS: usize = 3;

/// Attributes each year's contributions to its own allowance first, then to
/// unused allowance from up to three preceding years, nearest year first.
///
/// `records` must be ascending by tax year. Year `i` only reads breakdowns
/// already finalized at indices `< i`. Excess left after the lookback is not
/// recorded anywhere.
pub fn allocate(records: &[TaxYearRecord]) -> Vec<AllocationBreakdown> {
    let mut breakdowns: Vec<AllocationBreakdown> = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let mut breakdown = AllocationBreakdown {
            current_year_portion: record.used.min(record.allowance),
            carry_forward: Vec::new(),
        };

        let mut excess = (record.used - record.allowance).max(0.0);
        if excess > 0.0 {
            for offset in 1..=CARRY_FORWARD_YEARS {
                if excess <= 0.0 {
                    break;
                }
                let Some(p) = i.checked_sub(offset) else {
                    break;
                };
                let source = &records[p];
                let already_claimed = claimed_from(source.year_start, &breakdowns[p + 1..i]);
                let available = (source.allowance - source.used - already_claimed).max(0.0);
                let claim = excess.min(available);
                if claim > 0.0 {
                    breakdown.carry_forward.push(CarryForwardClaim {
                        from_year: source.year_start,
                        amount: claim,
                    });
                    excess -= claim;
                }
            }

            if excess > 0.0 {
                debug!(
                    year = %record.label,
                    unallocated = excess,
                    "excess exceeds carry-forward window"
                );
            }
        }

        breakdowns.push(breakdown);
    }

    breakdowns
}
