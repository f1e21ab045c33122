//! Shift report lifecycle: create-or-edit, the edit-permission gate, the
//! one-way submit transition, and the read queries.
//!
//! A report is addressed by its (date, shiftType, employeeName) triple; a
//! create request for a triple that already has a report edits it in place,
//! subject to the permission gate. Submission is the only path into the
//! accumulation engine and fires at most once per report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculations::{calculate_lottery_shift, calculate_pos_shift};
use crate::error::{Error, Result};
use crate::models::{
    parse_report_date, ActingUser, EditHistoryEntry, LotteryShiftData, PosShiftData, ReportStatus,
    ShiftReport, ShiftReportInput, ShiftType,
};
use crate::store::Store;
use crate::totals;

/// Minutes after submission during which the reporting employee may still
/// edit their own report.
const EDIT_GRACE_MINUTES: f64 = 10.0;

const DEFAULT_EDIT_REASON: &str = "Manager correction";

// ---------------------------------------------------------------------------
// Edit permission
// ---------------------------------------------------------------------------

/// Answer to "may this user edit this report right now".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPermission {
    pub can_edit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period_remaining_minutes: Option<f64>,
}

fn minutes_since_submission(report: &ShiftReport, now: DateTime<Utc>) -> Option<f64> {
    let submitted_at = report.submitted_at.as_deref()?;
    match DateTime::parse_from_rfc3339(submitted_at) {
        Ok(ts) => Some((now - ts.with_timezone(&Utc)).num_seconds() as f64 / 60.0),
        Err(_) => {
            warn!(report_id = %report.id, "Unparseable submittedAt, treating grace as expired");
            None
        }
    }
}

/// The permission gate. Checks run in order: role, ownership, grace
/// window, report age.
fn evaluate_edit(report: &ShiftReport, user: &ActingUser, now: DateTime<Utc>) -> EditPermission {
    if user.role.is_manager() {
        return EditPermission {
            can_edit: true,
            reason: None,
            grace_period_remaining_minutes: None,
        };
    }

    if report.employee_name != user.name {
        return EditPermission {
            can_edit: false,
            reason: Some("You can only edit your own reports".into()),
            grace_period_remaining_minutes: None,
        };
    }

    let mut remaining = None;
    if report.status == ReportStatus::Submitted {
        let elapsed = minutes_since_submission(report, now);
        match elapsed {
            Some(minutes) if minutes <= EDIT_GRACE_MINUTES => {
                remaining = Some((EDIT_GRACE_MINUTES - minutes).max(0.0));
            }
            _ => {
                return EditPermission {
                    can_edit: false,
                    reason: Some("Cannot edit report after 10-minute grace period".into()),
                    grace_period_remaining_minutes: None,
                };
            }
        }
    }

    match report.date_naive() {
        Ok(date) if date < now.date_naive() => EditPermission {
            can_edit: false,
            reason: Some("Cannot edit reports from previous days".into()),
            grace_period_remaining_minutes: None,
        },
        _ => EditPermission {
            can_edit: true,
            reason: None,
            grace_period_remaining_minutes: remaining,
        },
    }
}

/// Check whether `user` may edit the report with the given id.
pub fn check_edit_permission(
    store: &dyn Store,
    user: &ActingUser,
    id: &str,
) -> Result<EditPermission> {
    check_edit_permission_at(store, user, id, Utc::now())
}

fn check_edit_permission_at(
    store: &dyn Store,
    user: &ActingUser,
    id: &str,
    now: DateTime<Utc>,
) -> Result<EditPermission> {
    let report = store
        .find_shift_report(id)?
        .ok_or_else(|| Error::NotFound(id.to_string()))?;
    Ok(evaluate_edit(&report, user, now))
}

// ---------------------------------------------------------------------------
// Create or edit
// ---------------------------------------------------------------------------

/// Create a new shift report, or edit the existing one for the same
/// (date, shiftType, employeeName) triple.
///
/// Derived fields are recomputed from the raw counts on every call, so
/// resubmitting the stored counts reproduces the stored report exactly.
pub fn create_or_edit_shift_report(
    store: &dyn Store,
    user: &ActingUser,
    input: ShiftReportInput,
) -> Result<ShiftReport> {
    create_or_edit_at(store, user, input, Utc::now())
}

fn create_or_edit_at(
    store: &dyn Store,
    user: &ActingUser,
    input: ShiftReportInput,
    now: DateTime<Utc>,
) -> Result<ShiftReport> {
    input.validate()?;

    if !user.role.is_manager() && input.employee_name != user.name {
        return Err(Error::Permission(
            "You can only create reports for yourself".into(),
        ));
    }

    let date = parse_report_date(&input.date)?;
    if date > now.date_naive() {
        return Err(Error::Validation(
            "Cannot create reports for future dates".into(),
        ));
    }
    // Past days are closed books for non-managers, whether or not a
    // report for the triple already exists.
    if !user.role.is_manager() && date < now.date_naive() {
        return Err(Error::Permission(
            "Cannot edit reports from previous days".into(),
        ));
    }

    let existing = store.find_report_for_shift(&input.date, input.shift_type, &input.employee_name)?;

    if let Some(existing) = &existing {
        let permission = evaluate_edit(existing, user, now);
        if !permission.can_edit {
            return Err(Error::Permission(
                permission.reason.unwrap_or_else(|| "Edit not allowed".into()),
            ));
        }
    }

    let pos_shift_data = input.pos_shift_data.as_ref().map(|pos| {
        let calcs = calculate_pos_shift(&pos.counts());
        PosShiftData {
            am_start_till: pos.am_start_till,
            expected_deposit: pos.expected_deposit,
            lottery_till_added: pos.lottery_till_added,
            transfer_bank_actually_have: pos.transfer_bank_actually_have,
            comments: pos.comments.clone(),
            total_pos_sales: calcs.total_pos_sales,
            transfer_bank_should_have: calcs.transfer_bank_should_have,
            over_short: calcs.over_short,
        }
    });

    let lottery_shift_data = input.lottery_shift_data.as_ref().map(|lottery| {
        let calcs = calculate_lottery_shift(&lottery.counts());
        LotteryShiftData {
            am_start_till: lottery.am_start_till,
            video_cash_in: lottery.video_cash_in,
            online_sales: lottery.online_sales,
            extra_money_added: lottery.extra_money_added,
            extra_money_added_dayshift: lottery.extra_money_added_dayshift,
            extra_money_added_nightshift: lottery.extra_money_added_nightshift,
            online_validate: lottery.online_validate,
            free_tickets: lottery.free_tickets,
            scratch_it_validate: lottery.scratch_it_validate,
            misc_payout: lottery.misc_payout,
            misc_payout_dayshift: lottery.misc_payout_dayshift,
            misc_payout_nightshift: lottery.misc_payout_nightshift,
            transfer_bank: lottery.transfer_bank,
            comments: lottery.comments.clone(),
            money_given_to_pos: calcs.money_given_to_pos,
            video_validate: calcs.video_validate,
            total_lottery: calcs.total_lottery,
            over_short: calcs.over_short,
        }
    });

    // Zero-amount rows carry no information; drop them before storage.
    let lottery_draws = input.lottery_draws.map(|draws| {
        draws
            .into_iter()
            .filter(|draw| draw.draw_amount > 0.0)
            .collect::<Vec<_>>()
    });
    let transfer_bank_deposits = input.transfer_bank_deposits.map(|deposits| {
        deposits
            .into_iter()
            .filter(|d| d.transfer_bank_amount > 0.0 || d.deposit_amount > 0.0)
            .collect::<Vec<_>>()
    });

    let mut edit_history = existing
        .as_ref()
        .map(|e| e.edit_history.clone())
        .unwrap_or_default();
    if existing.is_some() && user.role.is_manager() {
        edit_history.push(EditHistoryEntry {
            edited_at: now.to_rfc3339(),
            edited_by: user.user_id.clone(),
            edited_by_name: user.name.clone(),
            edited_by_role: user.role,
            reason: input
                .edit_reason
                .clone()
                .unwrap_or_else(|| DEFAULT_EDIT_REASON.into()),
        });
    }

    let report = ShiftReport {
        id: existing
            .as_ref()
            .map(|e| e.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        date: input.date,
        shift_type: input.shift_type,
        employee_name: input.employee_name,
        status: existing
            .as_ref()
            .map(|e| e.status)
            .unwrap_or(ReportStatus::Draft),
        submitted_at: existing.as_ref().and_then(|e| e.submitted_at.clone()),
        submitted_by: existing.as_ref().and_then(|e| e.submitted_by.clone()),
        edit_history,
        atm_report: input.atm_report,
        pos_shift_data,
        barback_tip_out: input.barback_tip_out,
        lottery_shift_data,
        lottery_draws,
        transfer_bank_deposits,
        transfer_bank_details: input.transfer_bank_details,
    };

    store.upsert_shift_report(&report)?;

    info!(
        report_id = %report.id,
        date = %report.date,
        shift_type = report.shift_type.as_str(),
        employee = %report.employee_name,
        edited = existing.is_some(),
        "Shift report saved"
    );

    Ok(report)
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// One-way draft to submitted transition. Stamps the submission metadata
/// and folds the report into the derived ledgers, exactly once.
pub fn submit_shift_report(store: &dyn Store, user: &ActingUser, id: &str) -> Result<ShiftReport> {
    submit_at(store, user, id, Utc::now())
}

fn submit_at(
    store: &dyn Store,
    user: &ActingUser,
    id: &str,
    now: DateTime<Utc>,
) -> Result<ShiftReport> {
    let mut report = store
        .find_shift_report(id)?
        .ok_or_else(|| Error::NotFound(id.to_string()))?;

    if report.status != ReportStatus::Draft {
        return Err(Error::AlreadySubmitted);
    }

    report.status = ReportStatus::Submitted;
    report.submitted_at = Some(now.to_rfc3339());
    report.submitted_by = Some(user.user_id.clone());

    store.upsert_shift_report(&report)?;
    totals::apply_submission(store, &report, now)?;

    info!(
        report_id = %report.id,
        employee = %report.employee_name,
        submitted_by = %user.user_id,
        "Shift report submitted"
    );

    Ok(report)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Optional filters for the report listing. Employees are always scoped
/// to their own reports regardless of the filters supplied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilters {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub shift_type: Option<ShiftType>,
    #[serde(default)]
    pub employee_name: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// List reports visible to `user`, newest date first.
pub fn query_shift_reports(
    store: &dyn Store,
    user: &ActingUser,
    filters: &ReportFilters,
) -> Result<Vec<ShiftReport>> {
    let mut reports = store.shift_reports()?;

    if user.role.is_manager() {
        if let Some(employee) = &filters.employee_name {
            reports.retain(|r| &r.employee_name == employee);
        }
    } else {
        reports.retain(|r| r.employee_name == user.name);
    }

    if let Some(date) = &filters.date {
        reports.retain(|r| &r.date == date);
    }
    if let Some(shift_type) = filters.shift_type {
        reports.retain(|r| r.shift_type == shift_type);
    }
    // ISO dates compare correctly as strings.
    if let Some(start) = &filters.start_date {
        reports.retain(|r| &r.date >= start);
    }
    if let Some(end) = &filters.end_date {
        reports.retain(|r| &r.date <= end);
    }

    reports.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(reports)
}

/// Fetch one report by id. Employees may only see their own.
pub fn get_shift_report(store: &dyn Store, user: &ActingUser, id: &str) -> Result<ShiftReport> {
    let report = store
        .find_shift_report(id)?
        .ok_or_else(|| Error::NotFound(id.to_string()))?;
    if !user.role.is_manager() && report.employee_name != user.name {
        return Err(Error::Permission("You can only view your own reports".into()));
    }
    Ok(report)
}

/// All reports for one calendar date, day shift before night shift.
pub fn reports_for_date(store: &dyn Store, date: &str) -> Result<Vec<ShiftReport>> {
    let mut reports = store.shift_reports()?;
    reports.retain(|r| r.date == date);
    reports.sort_by(|a, b| {
        let order = |s: ShiftType| match s {
            ShiftType::Day => 0,
            ShiftType::Night => 1,
        };
        order(a.shift_type)
            .cmp(&order(b.shift_type))
            .then_with(|| a.employee_name.cmp(&b.employee_name))
    });
    Ok(reports)
}

/// The calling user's own reports, newest date first.
pub fn my_reports(store: &dyn Store, user: &ActingUser) -> Result<Vec<ShiftReport>> {
    let mut reports = store.shift_reports()?;
    reports.retain(|r| r.employee_name == user.name);
    reports.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(reports)
}

// ===========================================================================
// Tests
// ===========================================================================
