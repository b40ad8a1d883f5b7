//! Numeric helpers
//!
//! Clamping shared by speed commands and angle values, and conversion from
//! the controller's tenth-unit readings.

/// Clamp `value` into `[low, high]`: `max(low, min(high, value))`.
///
/// Works for any ordered type, so the same rule applies to integer speeds and
/// floating-point angles. Out-of-range input is silently pulled to the bound.
pub fn clamp<T: PartialOrd>(low: T, high: T, value: T) -> T {
    let capped = if value > high { high } else { value };
    if capped < low {
        low
    } else {
        capped
    }
}

/// Convert a reading in tenths (0.1 V, 0.1 A) to whole units
pub fn tenths_to_units(tenths: f64) -> f64 {
    tenths / 10.0
}
