//! Manager dashboard queries: latest submissions, per-date coverage, and
//! the combined overview payload.

use serde::Serialize;

use crate::aggregates;
use crate::error::Result;
use crate::models::{DailyAggregate, EmployeeTotal, ReportStatus, ShiftReport, ShiftType};
use crate::store::Store;

/// How many submissions a plain listing returns when no limit is given.
const DEFAULT_RECENT_LIMIT: usize = 20;
/// How many submissions the overview shows.
const OVERVIEW_RECENT_LIMIT: usize = 10;

/// A shift with no submitted report for a date, for an employee who has
/// reported at some point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingReport {
    pub employee_name: String,
    pub shift_type: ShiftType,
}

/// Everything the dashboard landing page needs in one call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub date: String,
    pub aggregates: DailyAggregate,
    pub recent_submissions: Vec<ShiftReport>,
    pub employee_totals: Vec<EmployeeTotal>,
}

/// The most recently submitted reports, newest submission first.
/// Without an explicit limit, the newest twenty are returned.
pub fn recent_submissions(store: &dyn Store, limit: Option<usize>) -> Result<Vec<ShiftReport>> {
    let mut reports = store.shift_reports()?;
    reports.retain(|r| r.status == ReportStatus::Submitted);
    // RFC 3339 timestamps in UTC compare correctly as strings.
    reports.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    reports.truncate(limit.unwrap_or(DEFAULT_RECENT_LIMIT));
    Ok(reports)
}

/// Shifts still unreported for `date`. The roster is inferred from the
/// report history itself: every employee who has ever filed a report is
/// expected to cover both shifts.
pub fn missing_reports(store: &dyn Store, date: &str) -> Result<Vec<MissingReport>> {
    let reports = store.shift_reports()?;

    let mut employees: Vec<&str> = reports.iter().map(|r| r.employee_name.as_str()).collect();
    employees.sort_unstable();
    employees.dedup();

    let mut missing = Vec::new();
    for employee in employees {
        for shift_type in [ShiftType::Day, ShiftType::Night] {
            let covered = reports.iter().any(|r| {
                r.date == date
                    && r.shift_type == shift_type
                    && r.employee_name == employee
                    && r.status == ReportStatus::Submitted
            });
            if !covered {
                missing.push(MissingReport {
                    employee_name: employee.to_string(),
                    shift_type,
                });
            }
        }
    }
    Ok(missing)
}

/// Aggregates for the date, the ten newest submissions, and every
/// employee ledger, in one payload.
pub fn overview(store: &dyn Store, date: &str) -> Result<DashboardOverview> {
    Ok(DashboardOverview {
        date: date.to_string(),
        aggregates: aggregates::daily_aggregate(store, date)?,
        recent_submissions: recent_submissions(store, Some(OVERVIEW_RECENT_LIMIT))?,
        employee_totals: aggregates::all_employee_totals(store)?,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
