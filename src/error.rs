//! Unified error type for the reconciliation core.
//!
//! Every fallible operation in the crate returns [`Error`], so the HTTP
//! layer (or any other caller) can map variants to status codes in one
//! place. All failures are surfaced synchronously; nothing in the core
//! retries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or out-of-range input. The request is rejected before any
    /// state change.
    #[error("validation error: {0}")]
    Validation(String),

    /// Edit or view denied by the shift-report edit policy. Carries the
    /// specific reason string shown to the caller.
    #[error("{0}")]
    Permission(String),

    /// Unknown shift report id.
    #[error("shift report not found: {0}")]
    NotFound(String),

    /// Submit attempted on a report that already left `draft`. Fatal to
    /// that call; no accumulation side effect happens.
    #[error("report already submitted")]
    AlreadySubmitted,

    /// Underlying persistence read/write failure. Writes are whole-record
    /// upserts, so state is assumed unchanged when this surfaces.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Storage(format!("document encode/decode: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
