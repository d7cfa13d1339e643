//! NaN-aware descriptive statistics
//!
//! `NaN` marks a missing value (a detection without a position, for example)
//! and is skipped by every function here.

/// Arithmetic mean of the non-NaN values; `NaN` if there are none.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Population standard deviation (ddof = 0) of the non-NaN values; `NaN` if
/// there are none.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn nan_population_std(values: &[f64]) -> f64 {
    let mean = nan_mean(values);
    if mean.is_nan() {
        return f64::NAN;
    }

    let (sum_sq, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| {
            (sum + (v - mean).powi(2), count + 1)
        });

    (sum_sq / count as f64).sqrt()
}

/// Sum of the non-NaN values (zero if there are none).
#[must_use]
pub fn nan_sum(values: &[f64]) -> f64 {
    values.iter().filter(|v| !v.is_nan()).sum()
}

/// Round to `decimals` places, ties to even.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
