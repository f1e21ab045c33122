//! Local SQLite persistence for shift reports and derived ledgers.
//!
//! Uses rusqlite with WAL mode. Reports are stored as a JSON document per
//! row with the identifying triple broken out into indexed columns; the
//! derived ledgers are plain column tables. Provides schema migrations and
//! the [`Store`] implementation shared across the service layer.

use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{DailyAggregate, EmployeeTotal, ShiftReport, ShiftType};
use crate::store::Store;

/// Shared connection state. rusqlite connections are not Sync, so all
/// access goes through the mutex; contention is negligible for a
/// single-location workload.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Initialize the database at `{data_dir}/tillbook.db`.
///
/// Creates the directory if needed, opens the connection, sets pragmas,
/// and runs any pending migrations. On corruption or open failure,
/// deletes the file and retries once.
pub fn init(data_dir: &Path) -> Result<SqliteStore> {
    fs::create_dir_all(data_dir)
        .map_err(|e| Error::Storage(format!("Failed to create data dir: {e}")))?;

    let db_path = data_dir.join("tillbook.db");
    info!("Opening database at {}", db_path.display());

    let conn = match open_and_configure(&db_path) {
        Ok(c) => c,
        Err(first_err) => {
            warn!(
                "Database open failed ({}), deleting and retrying once",
                first_err
            );
            if db_path.exists() {
                let _ = fs::remove_file(&db_path);
                // Also remove WAL/SHM files if present
                let wal = db_path.with_extension("db-wal");
                let shm = db_path.with_extension("db-shm");
                let _ = fs::remove_file(&wal);
                let _ = fs::remove_file(&shm);
            }
            open_and_configure(&db_path)
                .map_err(|e| Error::Storage(format!("Database open failed after retry: {e}")))?
        }
    };

    run_migrations(&conn)?;

    info!("Database initialized (schema v{CURRENT_SCHEMA_VERSION})");

    Ok(SqliteStore {
        conn: Mutex::new(conn),
        db_path,
    })
}

impl SqliteStore {
    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<SqliteStore> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        run_migrations(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("database lock poisoned".into()))
    }
}

/// Open the database file and apply pragmas.
fn open_and_configure(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;

    Ok(conn)
}

// ---------------------------------------------------------------------------
// Migrations
// ---------------------------------------------------------------------------

/// Run all pending migrations up to `CURRENT_SCHEMA_VERSION`.
fn run_migrations(conn: &Connection) -> Result<()> {
    // Ensure schema_version table exists first
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        info!("Database schema up to date (v{current})");
        return Ok(());
    }

    info!("Migrating database from v{current} to v{CURRENT_SCHEMA_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }
    if current < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Migration v1: report documents plus the two derived ledgers.
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- shift_reports: one row per (date, shift, employee); the full
        -- report lives in the doc column, identifying fields are broken
        -- out for lookups.
        CREATE TABLE IF NOT EXISTS shift_reports (
            id TEXT PRIMARY KEY,
            report_date TEXT NOT NULL,
            shift_type TEXT NOT NULL CHECK (shift_type IN ('day', 'night')),
            employee_name TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('draft', 'submitted')),
            submitted_at TEXT,
            doc TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            UNIQUE(report_date, shift_type, employee_name)
        );

        CREATE INDEX IF NOT EXISTS idx_shift_reports_date
            ON shift_reports(report_date);

        -- employee_totals: running over/short ledger per employee
        CREATE TABLE IF NOT EXISTS employee_totals (
            id TEXT PRIMARY KEY,
            employee_name TEXT NOT NULL UNIQUE,
            total_shortage REAL NOT NULL DEFAULT 0,
            total_overage REAL NOT NULL DEFAULT 0,
            last_updated TEXT NOT NULL
        );

        -- daily_aggregates: running cash totals per calendar date
        CREATE TABLE IF NOT EXISTS daily_aggregates (
            id TEXT PRIMARY KEY,
            aggregate_date TEXT NOT NULL UNIQUE,
            total_video_cash_in REAL NOT NULL DEFAULT 0,
            total_pos_deposit REAL NOT NULL DEFAULT 0,
            total_lottery_deposit REAL NOT NULL DEFAULT 0
        );

        INSERT INTO schema_version (version) VALUES (1);
        ",
    )?;
    Ok(())
}

/// Migration v2: indexes for the dashboard queries.
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_shift_reports_employee
            ON shift_reports(employee_name);
        CREATE INDEX IF NOT EXISTS idx_shift_reports_status
            ON shift_reports(status, submitted_at);

        INSERT INTO schema_version (version) VALUES (2);
        ",
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn decode_report(doc: &str) -> Result<ShiftReport> {
    Ok(serde_json::from_str(doc)?)
}

// ---------------------------------------------------------------------------
// Store implementation
// ---------------------------------------------------------------------------

impl Store for SqliteStore {
    fn shift_reports(&self) -> Result<Vec<ShiftReport>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT doc FROM shift_reports")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut reports = Vec::new();
        for doc in rows {
            reports.push(decode_report(&doc?)?);
        }
        Ok(reports)
    }

    fn find_shift_report(&self, id: &str) -> Result<Option<ShiftReport>> {
        let conn = self.lock()?;
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc FROM shift_reports WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        doc.as_deref().map(decode_report).transpose()
    }

    fn find_report_for_shift(
        &self,
        date: &str,
        shift_type: ShiftType,
        employee_name: &str,
    ) -> Result<Option<ShiftReport>> {
        let conn = self.lock()?;
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc FROM shift_reports
                 WHERE report_date = ?1 AND shift_type = ?2 AND employee_name = ?3",
                params![date, shift_type.as_str(), employee_name],
                |row| row.get(0),
            )
            .optional()?;
        doc.as_deref().map(decode_report).transpose()
    }

    fn upsert_shift_report(&self, report: &ShiftReport) -> Result<()> {
        let doc = serde_json::to_string(report)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO shift_reports
                (id, report_date, shift_type, employee_name, status, submitted_at, doc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                report_date = excluded.report_date,
                shift_type = excluded.shift_type,
                employee_name = excluded.employee_name,
                status = excluded.status,
                submitted_at = excluded.submitted_at,
                doc = excluded.doc,
                updated_at = datetime('now')",
            params![
                report.id,
                report.date,
                report.shift_type.as_str(),
                report.employee_name,
                report.status.as_str(),
                report.submitted_at,
                doc
            ],
        )?;
        Ok(())
    }

    fn employee_totals(&self) -> Result<Vec<EmployeeTotal>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, employee_name, total_shortage, total_overage, last_updated
             FROM employee_totals",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(EmployeeTotal {
                id: row.get(0)?,
                employee_name: row.get(1)?,
                total_shortage: row.get(2)?,
                total_overage: row.get(3)?,
                last_updated: row.get(4)?,
            })
        })?;
        let mut totals = Vec::new();
        for total in rows {
            totals.push(total?);
        }
        Ok(totals)
    }

    fn find_employee_total(&self, id_or_name: &str) -> Result<Option<EmployeeTotal>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, employee_name, total_shortage, total_overage, last_updated
             FROM employee_totals WHERE id = ?1 OR employee_name = ?1",
            params![id_or_name],
            |row| {
                Ok(EmployeeTotal {
                    id: row.get(0)?,
                    employee_name: row.get(1)?,
                    total_shortage: row.get(2)?,
                    total_overage: row.get(3)?,
                    last_updated: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn upsert_employee_total(&self, total: &EmployeeTotal) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO employee_totals
                (id, employee_name, total_shortage, total_overage, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(employee_name) DO UPDATE SET
                total_shortage = excluded.total_shortage,
                total_overage = excluded.total_overage,
                last_updated = excluded.last_updated",
            params![
                total.id,
                total.employee_name,
                total.total_shortage,
                total.total_overage,
                total.last_updated
            ],
        )?;
        Ok(())
    }

    fn increment_employee_total(
        &self,
        employee_name: &str,
        shortage_delta: f64,
        overage_delta: f64,
        last_updated: &str,
    ) -> Result<()> {
        let conn = self.lock()?;
        // Increment happens inside the statement, so concurrent
        // submissions serialize in the database instead of racing a
        // read-modify-write in Rust. Cent rounding is reapplied on
        // every accumulation.
        conn.execute(
            "INSERT INTO employee_totals
                (id, employee_name, total_shortage, total_overage, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(employee_name) DO UPDATE SET
                total_shortage = ROUND(total_shortage + excluded.total_shortage, 2),
                total_overage = ROUND(total_overage + excluded.total_overage, 2),
                last_updated = excluded.last_updated",
            params![
                Uuid::new_v4().to_string(),
                employee_name,
                shortage_delta,
                overage_delta,
                last_updated
            ],
        )?;
        Ok(())
    }

    fn daily_aggregates(&self) -> Result<Vec<DailyAggregate>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, aggregate_date, total_video_cash_in, total_pos_deposit,
                    total_lottery_deposit
             FROM daily_aggregates",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DailyAggregate {
                id: row.get(0)?,
                date: row.get(1)?,
                total_video_cash_in: row.get(2)?,
                total_pos_deposit: row.get(3)?,
                total_lottery_deposit: row.get(4)?,
            })
        })?;
        let mut aggregates = Vec::new();
        for aggregate in rows {
            aggregates.push(aggregate?);
        }
        Ok(aggregates)
    }

    fn find_daily_aggregate(&self, date: &str) -> Result<Option<DailyAggregate>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, aggregate_date, total_video_cash_in, total_pos_deposit,
                    total_lottery_deposit
             FROM daily_aggregates WHERE aggregate_date = ?1",
            params![date],
            |row| {
                Ok(DailyAggregate {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    total_video_cash_in: row.get(2)?,
                    total_pos_deposit: row.get(3)?,
                    total_lottery_deposit: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn upsert_daily_aggregate(&self, aggregate: &DailyAggregate) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO daily_aggregates
                (id, aggregate_date, total_video_cash_in, total_pos_deposit,
                 total_lottery_deposit)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(aggregate_date) DO UPDATE SET
                total_video_cash_in = excluded.total_video_cash_in,
                total_pos_deposit = excluded.total_pos_deposit,
                total_lottery_deposit = excluded.total_lottery_deposit",
            params![
                aggregate.id,
                aggregate.date,
                aggregate.total_video_cash_in,
                aggregate.total_pos_deposit,
                aggregate.total_lottery_deposit
            ],
        )?;
        Ok(())
    }

    fn increment_daily_aggregate(
        &self,
        date: &str,
        video_cash_in_delta: f64,
        pos_deposit_delta: f64,
        lottery_deposit_delta: f64,
    ) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO daily_aggregates
                (id, aggregate_date, total_video_cash_in, total_pos_deposit,
                 total_lottery_deposit)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(aggregate_date) DO UPDATE SET
                total_video_cash_in =
                    ROUND(total_video_cash_in + excluded.total_video_cash_in, 2),
                total_pos_deposit =
                    ROUND(total_pos_deposit + excluded.total_pos_deposit, 2),
                total_lottery_deposit =
                    ROUND(total_lottery_deposit + excluded.total_lottery_deposit, 2)",
            params![
                Uuid::new_v4().to_string(),
                date,
                video_cash_in_delta,
                pos_deposit_delta,
                lottery_deposit_delta
            ],
        )?;
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportStatus;

    fn sample_report(id: &str, date: &str, shift: ShiftType, employee: &str) -> ShiftReport {
        ShiftReport {
            id: id.into(),
            date: date.into(),
            shift_type: shift,
            employee_name: employee.into(),
            status: ReportStatus::Draft,
            submitted_at: None,
            submitted_by: None,
            edit_history: Vec::new(),
            atm_report: None,
            pos_shift_data: None,
            barback_tip_out: None,
            lottery_shift_data: None,
            lottery_draws: None,
            transfer_bank_deposits: None,
            transfer_bank_details: None,
        }
    }

    #[test]
    fn test_migrations_apply_once() {
        let store = SqliteStore::open_in_memory().expect("open");
        let conn = store.conn.lock().unwrap();
        let version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
        // Re-running is a no-op.
        run_migrations(&conn).expect("rerun");
    }

    #[test]
    fn test_report_round_trip_and_triple_lookup() {
        let store = SqliteStore::open_in_memory().expect("open");
        let report = sample_report("r-1", "2025-06-15", ShiftType::Day, "John Smith");
        store.upsert_shift_report(&report).expect("insert");

        let by_id = store.find_shift_report("r-1").expect("find").unwrap();
        assert_eq!(by_id.employee_name, "John Smith");
        assert_eq!(by_id.status, ReportStatus::Draft);

        let by_triple = store
            .find_report_for_shift("2025-06-15", ShiftType::Day, "John Smith")
            .expect("find triple")
            .unwrap();
        assert_eq!(by_triple.id, "r-1");

        assert!(store
            .find_report_for_shift("2025-06-15", ShiftType::Night, "John Smith")
            .expect("other shift")
            .is_none());
    }

    #[test]
    fn test_upsert_report_replaces_by_id() {
        let store = SqliteStore::open_in_memory().expect("open");
        let mut report = sample_report("r-1", "2025-06-15", ShiftType::Day, "John Smith");
        store.upsert_shift_report(&report).expect("insert");

        report.status = ReportStatus::Submitted;
        report.submitted_at = Some("2025-06-15T22:00:00Z".into());
        store.upsert_shift_report(&report).expect("update");

        let reports = store.shift_reports().expect("list");
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, ReportStatus::Submitted);
    }

    #[test]
    fn test_employee_total_upsert_by_name() {
        let store = SqliteStore::open_in_memory().expect("open");
        let total = EmployeeTotal {
            id: "t-1".into(),
            employee_name: "Jane".into(),
            total_shortage: 12.5,
            total_overage: 0.0,
            last_updated: "2025-06-15T22:00:00Z".into(),
        };
        store.upsert_employee_total(&total).expect("insert");

        let updated = EmployeeTotal {
            total_shortage: 20.0,
            ..total.clone()
        };
        store.upsert_employee_total(&updated).expect("update");

        let found = store.find_employee_total("Jane").expect("by name").unwrap();
        assert_eq!(found.total_shortage, 20.0);
        let by_id = store.find_employee_total("t-1").expect("by id").unwrap();
        assert_eq!(by_id.employee_name, "Jane");
        assert_eq!(store.employee_totals().expect("list").len(), 1);
    }

    #[test]
    fn test_increment_creates_then_accumulates() {
        let store = SqliteStore::open_in_memory().expect("open");
        store
            .increment_employee_total("Jane", 10.5, 0.0, "2025-06-15T22:00:00Z")
            .expect("first");
        store
            .increment_employee_total("Jane", 4.25, 7.0, "2025-06-15T23:00:00Z")
            .expect("second");

        let total = store.find_employee_total("Jane").expect("find").unwrap();
        assert_eq!(total.total_shortage, 14.75);
        assert_eq!(total.total_overage, 7.0);
        assert_eq!(total.last_updated, "2025-06-15T23:00:00Z");
        assert_eq!(store.employee_totals().expect("list").len(), 1);

        store
            .increment_daily_aggregate("2025-06-15", 300.0, 350.0, 80.0)
            .expect("first");
        store
            .increment_daily_aggregate("2025-06-15", 0.0, 425.0, 0.0)
            .expect("second");
        let aggregate = store
            .find_daily_aggregate("2025-06-15")
            .expect("find")
            .unwrap();
        assert_eq!(aggregate.total_video_cash_in, 300.0);
        assert_eq!(aggregate.total_pos_deposit, 775.0);
        assert_eq!(aggregate.total_lottery_deposit, 80.0);
    }

    #[test]
    fn test_daily_aggregate_upsert_by_date() {
        let store = SqliteStore::open_in_memory().expect("open");
        let aggregate = DailyAggregate {
            id: "a-1".into(),
            date: "2025-06-15".into(),
            total_video_cash_in: 300.0,
            total_pos_deposit: 350.0,
            total_lottery_deposit: 80.0,
        };
        store.upsert_daily_aggregate(&aggregate).expect("insert");

        let updated = DailyAggregate {
            total_video_cash_in: 500.0,
            ..aggregate.clone()
        };
        store.upsert_daily_aggregate(&updated).expect("update");

        let found = store
            .find_daily_aggregate("2025-06-15")
            .expect("find")
            .unwrap();
        assert_eq!(found.total_video_cash_in, 500.0);
        assert_eq!(store.daily_aggregates().expect("list").len(), 1);
        assert!(store
            .find_daily_aggregate("2025-06-16")
            .expect("missing")
            .is_none());
    }
}
