//! Pure shift calculators: POS till and lottery till.
//!
//! These are the deterministic formulas that turn raw shift counts into
//! sales totals, expected bank-transfer amounts, and signed over/short
//! variances. Both calculators are total functions over their inputs —
//! no shared state, no error conditions — and every output field is
//! rounded to 2 decimals independently via [`round2`].
//!
//! Sign convention everywhere: negative over/short = shortage, positive =
//! overage, zero = balanced.

use serde::{Deserialize, Serialize};

use crate::money::round2;

// ---------------------------------------------------------------------------
// POS shift
// ---------------------------------------------------------------------------

/// Raw POS till counts for one shift.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosShiftInput {
    pub am_start_till: f64,
    pub expected_deposit: f64,
    pub lottery_till_added: f64,
    pub transfer_bank_actually_have: f64,
}

/// Derived POS figures. Never independently mutated; recomputed whenever
/// the raw inputs are supplied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosShiftCalculations {
    pub total_pos_sales: f64,
    pub transfer_bank_should_have: f64,
    pub over_short: f64,
}

/// Calculate POS shift totals and over/short.
pub fn calculate_pos_shift(input: &PosShiftInput) -> PosShiftCalculations {
    let total_pos_sales = input.expected_deposit - input.am_start_till - input.lottery_till_added;

    // Algebraically equals expected_deposit; kept as its own named figure
    // because that is how the counting sheet reads.
    let transfer_bank_should_have = input.am_start_till + total_pos_sales + input.lottery_till_added;

    let over_short = input.transfer_bank_actually_have - transfer_bank_should_have;

    PosShiftCalculations {
        total_pos_sales: round2(total_pos_sales),
        transfer_bank_should_have: round2(transfer_bank_should_have),
        over_short: round2(over_short),
    }
}

// ---------------------------------------------------------------------------
// Lottery shift
// ---------------------------------------------------------------------------

/// Raw lottery till counts for one shift.
///
/// Day-shift reports populate only `extra_money_added` / `misc_payout`;
/// night-shift reports use the dayshift/nightshift split fields instead.
/// The calculator sums all three unconditionally, so callers must not
/// supply both forms for the same shift.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryShiftInput {
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
}

/// Derived lottery figures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryShiftCalculations {
    pub money_given_to_pos: f64,
    pub video_validate: f64,
    pub total_lottery: f64,
    pub over_short: f64,
}

/// Calculate lottery shift totals and over/short.
///
/// Two figures here are known business-logic gaps carried over on purpose:
/// `video_validate` is a pass-through of `video_cash_in` rather than a real
/// validation count, and `over_short` is structurally always zero because
/// `total_lottery` and the expected-remaining figure share one formula.
/// Downstream accumulation and reporting expect both names, so they stay
/// until the product owners supply the real rules.
pub fn calculate_lottery_shift(input: &LotteryShiftInput) -> LotteryShiftCalculations {
    let total_extra_money_added = input.extra_money_added
        + input.extra_money_added_dayshift
        + input.extra_money_added_nightshift;

    let total_misc_payout =
        input.misc_payout + input.misc_payout_dayshift + input.misc_payout_nightshift;

    // Everything handed across to the POS till during the shift.
    let money_given_to_pos =
        input.online_validate + input.free_tickets + input.scratch_it_validate + total_misc_payout;

    let video_validate = input.video_cash_in;

    let total_lottery = input.am_start_till + input.video_cash_in + input.online_sales
        + total_extra_money_added
        - money_given_to_pos
        - input.transfer_bank;

    let expected_remaining = input.am_start_till + input.video_cash_in + input.online_sales
        + total_extra_money_added
        - money_given_to_pos
        - input.transfer_bank;

    let over_short = total_lottery - expected_remaining;

    LotteryShiftCalculations {
        money_given_to_pos: round2(money_given_to_pos),
        video_validate: round2(video_validate),
        total_lottery: round2(total_lottery),
        over_short: round2(over_short),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos_shift_shortage_scenario() {
        // Known scenario from the counting sheet: 150 short.
        let calc = calculate_pos_shift(&PosShiftInput {
            am_start_till: 100.0,
            expected_deposit: 500.0,
            lottery_till_added: 50.0,
            transfer_bank_actually_have: 350.0,
        });
        assert_eq!(calc.total_pos_sales, 350.0);
        assert_eq!(calc.transfer_bank_should_have, 500.0);
        assert_eq!(calc.over_short, -150.0);
    }

    #[test]
    fn test_pos_shift_balanced_and_overage() {
        let balanced = calculate_pos_shift(&PosShiftInput {
            am_start_till: 200.0,
            expected_deposit: 800.0,
            lottery_till_added: 0.0,
            transfer_bank_actually_have: 800.0,
        });
        assert_eq!(balanced.over_short, 0.0);

        let over = calculate_pos_shift(&PosShiftInput {
            am_start_till: 200.0,
            expected_deposit: 800.0,
            lottery_till_added: 0.0,
            transfer_bank_actually_have: 805.5,
        });
        assert_eq!(over.over_short, 5.5);
    }

    #[test]
    fn test_pos_should_have_equals_expected_deposit() {
        // transfer_bank_should_have is algebraically the expected deposit;
        // check the identity holds within rounding over a spread of inputs.
        let cases = [
            (0.0, 0.0, 0.0, 0.0),
            (100.0, 500.0, 50.0, 350.0),
            (123.45, 987.65, 11.11, 800.0),
            (0.01, 0.03, 0.01, 0.02),
            (2500.0, 10000.0, 0.0, 9999.99),
        ];
        for (till, deposit, lottery, actual) in cases {
            let calc = calculate_pos_shift(&PosShiftInput {
                am_start_till: till,
                expected_deposit: deposit,
                lottery_till_added: lottery,
                transfer_bank_actually_have: actual,
            });
            assert!(
                (calc.transfer_bank_should_have - deposit).abs() <= 0.01,
                "should-have {} drifted from expected deposit {}",
                calc.transfer_bank_should_have,
                deposit
            );
        }
    }

    #[test]
    fn test_pos_outputs_rounded_independently() {
        let calc = calculate_pos_shift(&PosShiftInput {
            am_start_till: 100.111,
            expected_deposit: 500.555,
            lottery_till_added: 50.222,
            transfer_bank_actually_have: 350.333,
        });
        // 500.555 - 100.111 - 50.222 = 350.222
        assert_eq!(calc.total_pos_sales, 350.22);
        assert_eq!(calc.transfer_bank_should_have, 500.56);
        // Rounding happens on the unrounded intermediates, not the rounded ones.
        assert_eq!(calc.over_short, -150.22);
    }

    #[test]
    fn test_lottery_shift_known_scenario() {
        let calc = calculate_lottery_shift(&LotteryShiftInput {
            am_start_till: 200.0,
            video_cash_in: 300.0,
            online_sales: 150.0,
            extra_money_added: 0.0,
            extra_money_added_dayshift: 0.0,
            extra_money_added_nightshift: 0.0,
            online_validate: 50.0,
            free_tickets: 10.0,
            scratch_it_validate: 20.0,
            misc_payout: 30.0,
            misc_payout_dayshift: 0.0,
            misc_payout_nightshift: 0.0,
            transfer_bank: 540.0,
        });
        assert_eq!(calc.money_given_to_pos, 110.0);
        assert_eq!(calc.video_validate, 300.0);
        assert_eq!(calc.total_lottery, 0.0);
        assert_eq!(calc.over_short, 0.0);
    }

    #[test]
    fn test_lottery_over_short_always_zero() {
        // Structural property of the formula: over/short must come out
        // exactly zero after rounding for any inputs.
        let cases = [
            (100.0, 250.5, 75.25, 10.0, 5.0, 0.0, 40.0, 3.0, 12.5, 8.75, 0.0, 6.0, 300.0),
            (0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            (999.99, 1234.56, 0.01, 0.0, 77.7, 22.3, 500.0, 0.0, 0.0, 100.0, 50.0, 50.0, 1000.0),
        ];
        for c in cases {
            let calc = calculate_lottery_shift(&LotteryShiftInput {
                am_start_till: c.0,
                video_cash_in: c.1,
                online_sales: c.2,
                extra_money_added: c.3,
                extra_money_added_dayshift: c.4,
                extra_money_added_nightshift: c.5,
                online_validate: c.6,
                free_tickets: c.7,
                scratch_it_validate: c.8,
                misc_payout: c.9,
                misc_payout_dayshift: c.10,
                misc_payout_nightshift: c.11,
                transfer_bank: c.12,
            });
            assert_eq!(calc.over_short, 0.0);
        }
    }

    #[test]
    fn test_lottery_split_fields_sum_unconditionally() {
        // Night-shift form: split extra-money and misc-payout fields are
        // folded into the same totals as the day-shift fields.
        let calc = calculate_lottery_shift(&LotteryShiftInput {
            am_start_till: 100.0,
            video_cash_in: 0.0,
            online_sales: 0.0,
            extra_money_added: 10.0,
            extra_money_added_dayshift: 20.0,
            extra_money_added_nightshift: 30.0,
            online_validate: 0.0,
            free_tickets: 0.0,
            scratch_it_validate: 0.0,
            misc_payout: 5.0,
            misc_payout_dayshift: 15.0,
            misc_payout_nightshift: 25.0,
            transfer_bank: 0.0,
        });
        // money_given_to_pos picks up all three misc payouts
        assert_eq!(calc.money_given_to_pos, 45.0);
        // 100 + 60 extra - 45 payouts = 115 remaining in the till
        assert_eq!(calc.total_lottery, 115.0);
    }

    #[test]
    fn test_lottery_input_optional_fields_default_zero() {
        let parsed: LotteryShiftInput = serde_json::from_str(
            r#"{
                "amStartTill": 200.0,
                "videoCashIn": 300.0,
                "onlineSales": 150.0,
                "onlineValidate": 50.0,
                "freeTickets": 10.0,
                "scratchItValidate": 20.0,
                "miscPayout": 30.0,
                "transferBank": 540.0
            }"#,
        )
        .expect("lottery input without optional fields should parse");
        assert_eq!(parsed.extra_money_added, 0.0);
        assert_eq!(parsed.misc_payout_nightshift, 0.0);
        assert_eq!(calculate_lottery_shift(&parsed).money_given_to_pos, 110.0);
    }
}
