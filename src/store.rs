//! Persistence seam for reports and derived ledgers.
//!
//! Service code talks to `&dyn Store` so the SQLite backing can be swapped
//! for an in-memory store in tests without touching business logic.

use crate::error::Result;
use crate::models::{DailyAggregate, EmployeeTotal, ShiftReport, ShiftType};

pub trait Store: Send + Sync {
    /// All shift reports, unordered. Callers filter and sort.
    fn shift_reports(&self) -> Result<Vec<ShiftReport>>;

    fn find_shift_report(&self, id: &str) -> Result<Option<ShiftReport>>;

    /// Lookup by the identifying triple. At most one report can match.
    fn find_report_for_shift(
        &self,
        date: &str,
        shift_type: ShiftType,
        employee_name: &str,
    ) -> Result<Option<ShiftReport>>;

    /// Insert or replace a report by id.
    fn upsert_shift_report(&self, report: &ShiftReport) -> Result<()>;

    fn employee_totals(&self) -> Result<Vec<EmployeeTotal>>;

    /// Match on either the record id or the employee name.
    fn find_employee_total(&self, id_or_name: &str) -> Result<Option<EmployeeTotal>>;

    /// Insert or replace by employee name.
    fn upsert_employee_total(&self, total: &EmployeeTotal) -> Result<()>;

    /// Atomically add to an employee ledger, creating it at zero if
    /// absent. The read-modify-write must not be observable half-done
    /// by a concurrent caller.
    fn increment_employee_total(
        &self,
        employee_name: &str,
        shortage_delta: f64,
        overage_delta: f64,
        last_updated: &str,
    ) -> Result<()>;

    fn daily_aggregates(&self) -> Result<Vec<DailyAggregate>>;

    fn find_daily_aggregate(&self, date: &str) -> Result<Option<DailyAggregate>>;

    /// Insert or replace by date.
    fn upsert_daily_aggregate(&self, aggregate: &DailyAggregate) -> Result<()>;

    /// Atomically add to a date ledger, creating it at zero if absent.
    fn increment_daily_aggregate(
        &self,
        date: &str,
        video_cash_in_delta: f64,
        pos_deposit_delta: f64,
        lottery_deposit_delta: f64,
    ) -> Result<()>;
}
