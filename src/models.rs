//! Persisted data model and submission payloads.
//!
//! Wire shapes serialize in camelCase to stay byte-compatible with the
//! existing dashboard frontend. A [`ShiftReport`] is the unit of truth for
//! one shift; [`EmployeeTotal`] and [`DailyAggregate`] are derived,
//! incrementally-accumulated projections maintained by the accumulation
//! engine on submission.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calculations::{LotteryShiftInput, PosShiftInput};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftType {
    Day,
    Night,
}

impl ShiftType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftType::Day => "day",
            ShiftType::Night => "night",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Draft,
    Submitted,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Submitted => "submitted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    /// Managers and admins share the elevated edit/audit rules.
    pub fn is_manager(&self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }
}

/// The authenticated identity performing an operation. Produced by the
/// external auth collaborator; the core never issues or validates
/// credentials, and every operation requires a real acting user (no
/// development fallback identity).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActingUser {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

// ---------------------------------------------------------------------------
// Shift report sub-records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtmReport {
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarbackTipOut {
    pub total_tips_made: f64,
    pub barback_tip_out: f64,
}

/// POS till section of a stored report: raw counts plus the derived
/// figures merged into one record, the way the frontend reads it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosShiftData {
    pub am_start_till: f64,
    pub expected_deposit: f64,
    pub lottery_till_added: f64,
    pub transfer_bank_actually_have: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    // Derived — replaced wholesale whenever the raw counts are re-supplied.
    pub total_pos_sales: f64,
    pub transfer_bank_should_have: f64,
    pub over_short: f64,
}

impl PosShiftData {
    /// Raw counts for recomputation (idempotent: feeding these back through
    /// the calculator reproduces the stored derived fields).
    pub fn counts(&self) -> PosShiftInput {
        PosShiftInput {
            am_start_till: self.am_start_till,
            expected_deposit: self.expected_deposit,
            lottery_till_added: self.lottery_till_added,
            transfer_bank_actually_have: self.transfer_bank_actually_have,
        }
    }
}

/// Lottery till section of a stored report, raw plus derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryShiftData {
    pub am_start_till: f64,
    pub video_cash_in: f64,
    pub online_sales: f64,
    #[serde(default)]
    pub extra_money_added: f64,
    #[serde(default)]
    pub extra_money_added_dayshift: f64,
    #[serde(default)]
    pub extra_money_added_nightshift: f64,
    pub online_validate: f64,
    pub free_tickets: f64,
    pub scratch_it_validate: f64,
    pub misc_payout: f64,
    #[serde(default)]
    pub misc_payout_dayshift: f64,
    #[serde(default)]
    pub misc_payout_nightshift: f64,
    pub transfer_bank: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    // Derived
    pub money_given_to_pos: f64,
    pub video_validate: f64,
    pub total_lottery: f64,
    pub over_short: f64,
}

impl LotteryShiftData {
    pub fn counts(&self) -> LotteryShiftInput {
        LotteryShiftInput {
            am_start_till: self.am_start_till,
            video_cash_in: self.video_cash_in,
            online_sales: self.online_sales,
            extra_money_added: self.extra_money_added,
            extra_money_added_dayshift: self.extra_money_added_dayshift,
            extra_money_added_nightshift: self.extra_money_added_nightshift,
            online_validate: self.online_validate,
            free_tickets: self.free_tickets,
            scratch_it_validate: self.scratch_it_validate,
            misc_payout: self.misc_payout,
            misc_payout_dayshift: self.misc_payout_dayshift,
            misc_payout_nightshift: self.misc_payout_nightshift,
            transfer_bank: self.transfer_bank,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryDraw {
    pub draw_number: u8,
    pub draw_amount: f64,
}

/// Per-denomination line of the transfer-bank count sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferBankDeposit {
    pub denomination_type: String,
    pub transfer_bank_amount: f64,
    pub deposit_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferBankDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_bank_blue_bag: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_should_have: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actually_have_black_bag: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cash_deposit: Option<f64>,
}

/// One entry of the append-only audit trail. Only manager/admin edits are
/// recorded; the log is never retroactively edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditHistoryEntry {
    pub edited_at: String,
    pub edited_by: String,
    pub edited_by_name: String,
    pub edited_by_role: Role,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Shift report
// ---------------------------------------------------------------------------

/// One cash-handling report: one employee, one date, one shift type.
///
/// At most one report exists per (date, shiftType, employeeName) triple; a
/// later create for the same triple edits the existing record in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftReport {
    pub id: String,
    /// Calendar day, `YYYY-MM-DD`, no time component.
    pub date: String,
    pub shift_type: ShiftType,
    pub employee_name: String,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,
    #[serde(default)]
    pub edit_history: Vec<EditHistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atm_report: Option<AtmReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos_shift_data: Option<PosShiftData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barback_tip_out: Option<BarbackTipOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lottery_shift_data: Option<LotteryShiftData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lottery_draws: Option<Vec<LotteryDraw>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_bank_deposits: Option<Vec<TransferBankDeposit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_bank_details: Option<TransferBankDetails>,
}

impl ShiftReport {
    pub fn date_naive(&self) -> Result<NaiveDate> {
        parse_report_date(&self.date)
    }
}

// ---------------------------------------------------------------------------
// Derived ledgers
// ---------------------------------------------------------------------------

/// Running over/short ledger for one employee. The accumulators only ever
/// grow; nothing in the core decrements or resets them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeTotal {
    pub id: String,
    pub employee_name: String,
    pub total_shortage: f64,
    pub total_overage: f64,
    pub last_updated: String,
}

/// Running cash-in/deposit ledger for one calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAggregate {
    pub id: String,
    pub date: String,
    pub total_video_cash_in: f64,
    pub total_pos_deposit: f64,
    pub total_lottery_deposit: f64,
}

// ---------------------------------------------------------------------------
// Submission payloads
// ---------------------------------------------------------------------------

/// POS section as submitted: raw counts only, derived fields are computed
/// by the report builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosShiftDataInput {
    pub am_start_till: f64,
    pub expected_deposit: f64,
    pub lottery_till_added: f64,
    pub transfer_bank_actually_have: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl PosShiftDataInput {
    pub fn counts(&self) -> PosShiftInput {
        PosShiftInput {
            am_start_till: self.am_start_till,
            expected_deposit: self.expected_deposit,
            lottery_till_added: self.lottery_till_added,
            transfer_bank_actually_have: self.transfer_bank_actually_have,
        }
    }
}

/// Lottery section as submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryShiftDataInput {
    pub am_start_till: f64,
    pub video_cash_in: f64,
    pub online_sales: f64,
    #[serde(default)]
    pub extra_money_added: f64,
    #[serde(default)]
    pub extra_money_added_dayshift: f64,
    #[serde(default)]
    pub extra_money_added_nightshift: f64,
    pub online_validate: f64,
    pub free_tickets: f64,
    pub scratch_it_validate: f64,
    pub misc_payout: f64,
    #[serde(default)]
    pub misc_payout_dayshift: f64,
    #[serde(default)]
    pub misc_payout_nightshift: f64,
    pub transfer_bank: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl LotteryShiftDataInput {
    pub fn counts(&self) -> LotteryShiftInput {
        LotteryShiftInput {
            am_start_till: self.am_start_till,
            video_cash_in: self.video_cash_in,
            online_sales: self.online_sales,
            extra_money_added: self.extra_money_added,
            extra_money_added_dayshift: self.extra_money_added_dayshift,
            extra_money_added_nightshift: self.extra_money_added_nightshift,
            online_validate: self.online_validate,
            free_tickets: self.free_tickets,
            scratch_it_validate: self.scratch_it_validate,
            misc_payout: self.misc_payout,
            misc_payout_dayshift: self.misc_payout_dayshift,
            misc_payout_nightshift: self.misc_payout_nightshift,
            transfer_bank: self.transfer_bank,
        }
    }
}

/// A complete create-or-edit request for one shift report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftReportInput {
    pub date: String,
    pub shift_type: ShiftType,
    pub employee_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atm_report: Option<AtmReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_shift_data: Option<PosShiftDataInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barback_tip_out: Option<BarbackTipOut>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lottery_shift_data: Option<LotteryShiftDataInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lottery_draws: Option<Vec<LotteryDraw>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_bank_deposits: Option<Vec<TransferBankDeposit>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_bank_details: Option<TransferBankDetails>,
    /// Audit-trail note when a manager/admin corrects an existing report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Denominations accepted on the transfer-bank count sheet.
const DENOMINATION_TYPES: &[&str] = &["coin", "1", "2", "5", "10", "20", "50", "100"];

const MIN_DRAW_NUMBER: u8 = 1;
const MAX_DRAW_NUMBER: u8 = 8;

pub fn parse_report_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("Date must be in YYYY-MM-DD format: {date}")))
}

fn require_non_negative(field: &str, value: f64) -> Result<()> {
    // `>= 0.0` is false for NaN, so non-finite garbage is rejected here too.
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{field} must be a non-negative amount"
        )))
    }
}

impl ShiftReportInput {
    /// Validate the whole payload before any state is touched.
    pub fn validate(&self) -> Result<()> {
        parse_report_date(&self.date)?;

        if self.employee_name.trim().is_empty() {
            return Err(Error::Validation("Employee name is required".into()));
        }

        if let Some(atm) = &self.atm_report {
            require_non_negative("atmReport.amount", atm.amount)?;
        }

        if let Some(pos) = &self.pos_shift_data {
            require_non_negative("posShiftData.amStartTill", pos.am_start_till)?;
            require_non_negative("posShiftData.expectedDeposit", pos.expected_deposit)?;
            require_non_negative("posShiftData.lotteryTillAdded", pos.lottery_till_added)?;
            require_non_negative(
                "posShiftData.transferBankActuallyHave",
                pos.transfer_bank_actually_have,
            )?;
        }

        if let Some(tips) = &self.barback_tip_out {
            require_non_negative("barbackTipOut.totalTipsMade", tips.total_tips_made)?;
            require_non_negative("barbackTipOut.barbackTipOut", tips.barback_tip_out)?;
        }

        if let Some(lottery) = &self.lottery_shift_data {
            require_non_negative("lotteryShiftData.amStartTill", lottery.am_start_till)?;
            require_non_negative("lotteryShiftData.videoCashIn", lottery.video_cash_in)?;
            require_non_negative("lotteryShiftData.onlineSales", lottery.online_sales)?;
            require_non_negative("lotteryShiftData.extraMoneyAdded", lottery.extra_money_added)?;
            require_non_negative(
                "lotteryShiftData.extraMoneyAddedDayshift",
                lottery.extra_money_added_dayshift,
            )?;
            require_non_negative(
                "lotteryShiftData.extraMoneyAddedNightshift",
                lottery.extra_money_added_nightshift,
            )?;
            require_non_negative("lotteryShiftData.onlineValidate", lottery.online_validate)?;
            require_non_negative("lotteryShiftData.freeTickets", lottery.free_tickets)?;
            require_non_negative(
                "lotteryShiftData.scratchItValidate",
                lottery.scratch_it_validate,
            )?;
            require_non_negative("lotteryShiftData.miscPayout", lottery.misc_payout)?;
            require_non_negative(
                "lotteryShiftData.miscPayoutDayshift",
                lottery.misc_payout_dayshift,
            )?;
            require_non_negative(
                "lotteryShiftData.miscPayoutNightshift",
                lottery.misc_payout_nightshift,
            )?;
            require_non_negative("lotteryShiftData.transferBank", lottery.transfer_bank)?;
        }

        if let Some(draws) = &self.lottery_draws {
            for draw in draws {
                if draw.draw_number < MIN_DRAW_NUMBER || draw.draw_number > MAX_DRAW_NUMBER {
                    return Err(Error::Validation(format!(
                        "lotteryDraws.drawNumber must be between {MIN_DRAW_NUMBER} and {MAX_DRAW_NUMBER}"
                    )));
                }
                require_non_negative("lotteryDraws.drawAmount", draw.draw_amount)?;
            }
        }

        if let Some(deposits) = &self.transfer_bank_deposits {
            for deposit in deposits {
                if !DENOMINATION_TYPES.contains(&deposit.denomination_type.as_str()) {
                    return Err(Error::Validation(format!(
                        "Unknown denomination type: {}",
                        deposit.denomination_type
                    )));
                }
                require_non_negative(
                    "transferBankDeposits.transferBankAmount",
                    deposit.transfer_bank_amount,
                )?;
                require_non_negative(
                    "transferBankDeposits.depositAmount",
                    deposit.deposit_amount,
                )?;
            }
        }

        if let Some(details) = &self.transfer_bank_details {
            for (field, value) in [
                ("transferBankDetails.transferBankBlueBag", details.transfer_bank_blue_bag),
                ("transferBankDetails.depositShouldHave", details.deposit_should_have),
                ("transferBankDetails.actuallyHaveBlackBag", details.actually_have_black_bag),
                ("transferBankDetails.totalCashDeposit", details.total_cash_deposit),
            ] {
                if let Some(v) = value {
                    require_non_negative(field, v)?;
                }
            }
        }

        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_input() -> ShiftReportInput {
        ShiftReportInput {
            date: "2025-06-15".into(),
            shift_type: ShiftType::Day,
            employee_name: "John Smith".into(),
            atm_report: None,
            pos_shift_data: None,
            barback_tip_out: None,
            lottery_shift_data: None,
            lottery_draws: None,
            transfer_bank_deposits: None,
            transfer_bank_details: None,
            edit_reason: None,
        }
    }

    #[test]
    fn test_validate_minimal_input() {
        assert!(minimal_input().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_date() {
        let mut input = minimal_input();
        input.date = "06/15/2025".into();
        assert!(matches!(input.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_blank_employee() {
        let mut input = minimal_input();
        input.employee_name = "   ".into();
        assert!(matches!(input.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_negative_amount() {
        let mut input = minimal_input();
        input.pos_shift_data = Some(PosShiftDataInput {
            am_start_till: 100.0,
            expected_deposit: -1.0,
            lottery_till_added: 0.0,
            transfer_bank_actually_have: 0.0,
            comments: None,
        });
        assert!(matches!(input.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_nan_amount() {
        let mut input = minimal_input();
        input.atm_report = Some(AtmReport { amount: f64::NAN });
        assert!(matches!(input.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_draw_number_range() {
        let mut input = minimal_input();
        input.lottery_draws = Some(vec![LotteryDraw {
            draw_number: 9,
            draw_amount: 5.0,
        }]);
        assert!(matches!(input.validate(), Err(Error::Validation(_))));

        input.lottery_draws = Some(vec![LotteryDraw {
            draw_number: 8,
            draw_amount: 5.0,
        }]);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_validate_denomination_type() {
        let mut input = minimal_input();
        input.transfer_bank_deposits = Some(vec![TransferBankDeposit {
            denomination_type: "25".into(),
            transfer_bank_amount: 10.0,
            deposit_amount: 0.0,
        }]);
        assert!(matches!(input.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_shift_report_serializes_camel_case() {
        let report = ShiftReport {
            id: "r-1".into(),
            date: "2025-06-15".into(),
            shift_type: ShiftType::Night,
            employee_name: "Jane".into(),
            status: ReportStatus::Draft,
            submitted_at: None,
            submitted_by: None,
            edit_history: Vec::new(),
            atm_report: Some(AtmReport { amount: 120.0 }),
            pos_shift_data: None,
            barback_tip_out: None,
            lottery_shift_data: None,
            lottery_draws: None,
            transfer_bank_deposits: None,
            transfer_bank_details: None,
        };
        let json = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(json["shiftType"], "night");
        assert_eq!(json["employeeName"], "Jane");
        assert_eq!(json["status"], "draft");
        assert_eq!(json["atmReport"]["amount"], 120.0);
        // Absent optional sections are omitted, not serialized as null.
        assert!(json.get("posShiftData").is_none());
        assert!(json.get("submittedAt").is_none());
    }
}
