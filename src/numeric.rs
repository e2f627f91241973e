//! Numeric guards used by distance, locator and cost code.

/// Divide, yielding `0.0` when the denominator is exactly zero.
///
/// Every weighted average and ratio in the crate goes through here so a
/// zero weight, capacity or distance never produces `NaN` or infinity.
#[inline]
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Percentage of `part` in `whole`, `0.0` when `whole` is zero.
#[inline]
pub fn percent(part: f64, whole: f64) -> f64 {
    safe_div(part, whole) * 100.0
}
