//! Tillbook - shift reconciliation and cash accounting core.
//!
//! Employees file one report per shift covering the POS till and the
//! lottery till; the calculators derive the over/short figures, and
//! submission folds each report into running per-employee and per-date
//! ledgers that the manager dashboard reads back. Persistence is local
//! SQLite behind the [`store::Store`] trait.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod aggregates;
pub mod calculations;
pub mod dashboard;
pub mod db;
pub mod models;
pub mod money;
pub mod reports;
pub mod store;
pub mod totals;

mod error;

pub use error::{Error, Result};

/// Install the global tracing subscriber. Filter comes from `RUST_LOG`,
/// defaulting to `info`. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .ok();
}
