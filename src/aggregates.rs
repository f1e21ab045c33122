//! Read-side queries over the derived ledgers.
//!
//! Missing rows read as zero: a date with no submissions has a zero
//! aggregate and an unknown employee has a zero total, so callers never
//! need a "no data yet" branch.

use chrono::{Datelike, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::{parse_report_date, DailyAggregate, EmployeeTotal};
use crate::money::round2;
use crate::store::Store;

/// Cash totals for one calendar month, summed over its daily aggregates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAggregate {
    pub year: i32,
    pub month: u32,
    pub total_video_cash_in: f64,
    pub total_pos_deposit: f64,
    pub total_lottery_deposit: f64,
}

/// The aggregate for one date, or a zero-valued one if nothing has been
/// submitted for it yet.
pub fn daily_aggregate(store: &dyn Store, date: &str) -> Result<DailyAggregate> {
    parse_report_date(date)?;
    Ok(store
        .find_daily_aggregate(date)?
        .unwrap_or_else(|| DailyAggregate {
            id: String::new(),
            date: date.to_string(),
            total_video_cash_in: 0.0,
            total_pos_deposit: 0.0,
            total_lottery_deposit: 0.0,
        }))
}

/// Sum the daily aggregates that fall inside the given month.
pub fn monthly_aggregate(store: &dyn Store, year: i32, month: u32) -> Result<MonthlyAggregate> {
    let mut totals = MonthlyAggregate {
        year,
        month,
        total_video_cash_in: 0.0,
        total_pos_deposit: 0.0,
        total_lottery_deposit: 0.0,
    };

    for aggregate in store.daily_aggregates()? {
        let Ok(date) = parse_report_date(&aggregate.date) else {
            continue;
        };
        if date.year() == year && date.month() == month {
            totals.total_video_cash_in += aggregate.total_video_cash_in;
            totals.total_pos_deposit += aggregate.total_pos_deposit;
            totals.total_lottery_deposit += aggregate.total_lottery_deposit;
        }
    }

    totals.total_video_cash_in = round2(totals.total_video_cash_in);
    totals.total_pos_deposit = round2(totals.total_pos_deposit);
    totals.total_lottery_deposit = round2(totals.total_lottery_deposit);
    Ok(totals)
}

/// Running over/short ledger for one employee, by record id or name. An
/// employee with no submissions yet reads as a zero-valued ledger.
pub fn employee_total(store: &dyn Store, id_or_name: &str) -> Result<EmployeeTotal> {
    Ok(store
        .find_employee_total(id_or_name)?
        .unwrap_or_else(|| EmployeeTotal {
            id: String::new(),
            employee_name: id_or_name.to_string(),
            total_shortage: 0.0,
            total_overage: 0.0,
            last_updated: Utc::now().to_rfc3339(),
        }))
}

/// All employee ledgers, ordered by employee name.
pub fn all_employee_totals(store: &dyn Store) -> Result<Vec<EmployeeTotal>> {
    let mut totals = store.employee_totals()?;
    totals.sort_by(|a, b| a.employee_name.cmp(&b.employee_name));
    Ok(totals)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::error::Error;

    fn seed_aggregate(store: &SqliteStore, id: &str, date: &str, video: f64, pos: f64, lottery: f64) {
        store
            .upsert_daily_aggregate(&DailyAggregate {
                id: id.into(),
                date: date.into(),
                total_video_cash_in: video,
                total_pos_deposit: pos,
                total_lottery_deposit: lottery,
            })
            .expect("seed");
    }

    #[test]
    fn test_daily_aggregate_defaults_to_zero() {
        let store = SqliteStore::open_in_memory().expect("open");
        let aggregate = daily_aggregate(&store, "2025-06-15").expect("get");
        assert_eq!(aggregate.date, "2025-06-15");
        assert_eq!(aggregate.total_video_cash_in, 0.0);
        assert_eq!(aggregate.total_pos_deposit, 0.0);
        assert_eq!(aggregate.total_lottery_deposit, 0.0);
    }

    #[test]
    fn test_daily_aggregate_rejects_bad_date() {
        let store = SqliteStore::open_in_memory().expect("open");
        let err = daily_aggregate(&store, "June 15").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_monthly_aggregate_sums_only_that_month() {
        let store = SqliteStore::open_in_memory().expect("open");
        seed_aggregate(&store, "a-1", "2025-06-01", 100.0, 200.0, 50.0);
        seed_aggregate(&store, "a-2", "2025-06-30", 25.5, 75.25, 10.0);
        seed_aggregate(&store, "a-3", "2025-07-01", 999.0, 999.0, 999.0);
        seed_aggregate(&store, "a-4", "2024-06-15", 999.0, 999.0, 999.0);

        let monthly = monthly_aggregate(&store, 2025, 6).expect("monthly");
        assert_eq!(monthly.total_video_cash_in, 125.5);
        assert_eq!(monthly.total_pos_deposit, 275.25);
        assert_eq!(monthly.total_lottery_deposit, 60.0);
    }

    #[test]
    fn test_monthly_aggregate_empty_month_is_zero() {
        let store = SqliteStore::open_in_memory().expect("open");
        let monthly = monthly_aggregate(&store, 2025, 2).expect("monthly");
        assert_eq!(monthly.total_pos_deposit, 0.0);
    }

    #[test]
    fn test_employee_total_placeholder_for_unknown_employee() {
        let store = SqliteStore::open_in_memory().expect("open");
        let total = employee_total(&store, "Nobody").expect("get");
        assert_eq!(total.employee_name, "Nobody");
        assert_eq!(total.total_shortage, 0.0);
        assert_eq!(total.total_overage, 0.0);
        assert!(!total.last_updated.is_empty());
    }

    #[test]
    fn test_all_employee_totals_sorted_by_name() {
        let store = SqliteStore::open_in_memory().expect("open");
        for (id, name) in [("t-1", "Zoe"), ("t-2", "Amir"), ("t-3", "Mona")] {
            store
                .upsert_employee_total(&EmployeeTotal {
                    id: id.into(),
                    employee_name: name.into(),
                    total_shortage: 0.0,
                    total_overage: 0.0,
                    last_updated: "2025-06-15T22:00:00Z".into(),
                })
                .expect("seed");
        }
        let totals = all_employee_totals(&store).expect("list");
        let names: Vec<_> = totals.iter().map(|t| t.employee_name.as_str()).collect();
        assert_eq!(names, ["Amir", "Mona", "Zoe"]);
    }
}
