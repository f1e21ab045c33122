//! Money arithmetic for the reconciliation calculators.
//!
//! All computed monetary outputs are rounded to two decimal places at the
//! point each output field is produced. Raw stored inputs are never
//! rounded. NaN/infinite inputs are a caller contract violation and are
//! not handled here.

/// Round a currency amount to 2 decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
