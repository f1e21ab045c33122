//! Accumulation engine: folds a submitted report into the derived ledgers.
//!
//! Runs exactly once per report lifetime, at the draft to submitted
//! transition. Shortages and overages land in separate accumulators that
//! only ever grow; there is no recompute-from-scratch path, so a
//! manager edit after submission does not rewrite history.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::Result;
use crate::models::{EmployeeTotal, ShiftReport};
use crate::money::round2;
use crate::store::Store;

/// Fold one signed over/short figure into an employee ledger. Negative
/// grows the shortage bucket by the magnitude, positive grows the overage
/// bucket, zero touches neither.
pub fn apply_over_short(total: &mut EmployeeTotal, over_short: f64) {
    if over_short < 0.0 {
        total.total_shortage = round2(total.total_shortage + over_short.abs());
    } else if over_short > 0.0 {
        total.total_overage = round2(total.total_overage + over_short);
    }
}

/// Apply a freshly submitted report to both ledgers.
///
/// Deltas are computed up front and handed to the store's atomic
/// upsert-and-increment operations, so concurrent submissions serialize
/// per ledger row instead of racing a read-modify-write here.
pub(crate) fn apply_submission(
    store: &dyn Store,
    report: &ShiftReport,
    now: DateTime<Utc>,
) -> Result<()> {
    let pos_over_short = report.pos_shift_data.as_ref().map(|p| p.over_short);
    let lottery_over_short = report.lottery_shift_data.as_ref().map(|l| l.over_short);

    if pos_over_short.is_some() || lottery_over_short.is_some() {
        let mut shortage_delta = 0.0;
        let mut overage_delta = 0.0;
        for over_short in [pos_over_short, lottery_over_short].into_iter().flatten() {
            if over_short < 0.0 {
                shortage_delta += over_short.abs();
            } else if over_short > 0.0 {
                overage_delta += over_short;
            }
        }
        store.increment_employee_total(
            &report.employee_name,
            round2(shortage_delta),
            round2(overage_delta),
            &now.to_rfc3339(),
        )?;

        info!(
            employee = %report.employee_name,
            shortage_delta = round2(shortage_delta),
            overage_delta = round2(overage_delta),
            "Employee totals updated"
        );
    }

    if report.pos_shift_data.is_some() || report.lottery_shift_data.is_some() {
        let pos_deposit = report
            .pos_shift_data
            .as_ref()
            .map(|p| p.transfer_bank_actually_have)
            .unwrap_or(0.0);
        let (video_cash_in, lottery_deposit) = report
            .lottery_shift_data
            .as_ref()
            .map(|l| (l.video_cash_in, l.transfer_bank))
            .unwrap_or((0.0, 0.0));

        store.increment_daily_aggregate(
            &report.date,
            round2(video_cash_in),
            round2(pos_deposit),
            round2(lottery_deposit),
        )?;

        info!(
            date = %report.date,
            pos_deposit_delta = pos_deposit,
            lottery_deposit_delta = lottery_deposit,
            "Daily aggregate updated"
        );
    }

    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================
