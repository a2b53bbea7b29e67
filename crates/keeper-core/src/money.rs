//! Monetary arithmetic helpers
//!
//! Amounts are stored as `f64` and rounded to whole cents after every
//! addition or subtraction so that drift never accumulates in stored totals.

/// Round an amount to two decimal places (half away from zero)
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Add two amounts, rounding the result to cents
pub fn add(a: f64, b: f64) -> f64 {
    round_cents(a + b)
}

/// Subtract `b` from `a`, rounding the result to cents
pub fn sub(a: f64, b: f64) -> f64 {
    round_cents(a - b)
}
