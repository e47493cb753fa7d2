//! Short-horizon forecasting by linear extrapolation.
//!
//! A history is treated as the points `(i, v_i)` in chronological order. An
//! ordinary least-squares line is fitted over every point and evaluated
//! `horizon` samples past the newest one.

use crate::metric::PERCENT_BOUNDS;

/// Default number of ticks to extrapolate ahead.
pub const DEFAULT_HORIZON: usize = 12;

/// Predicts a percentage metric `horizon` samples ahead, clamped to `[0, 100]`.
///
/// Returns `0` for an empty history.
pub fn predict(history: &[f64], horizon: usize) -> f64 {
    predict_within(history, horizon, Some(PERCENT_BOUNDS))
}

/// Predicts `horizon` samples ahead, clamping to `bounds` when given.
pub fn predict_within(history: &[f64], horizon: usize, bounds: Option<(f64, f64)>) -> f64 {
    if history.is_empty() {
        return 0.0;
    }

    let (slope, intercept) = fit_line(history);
    let x = (history.len() - 1) as f64 + horizon as f64;
    let prediction = slope * x + intercept;

    match bounds {
        Some((lower, upper)) => prediction.clamp(lower, upper),
        None => prediction,
    }
}

/// Least-squares fit of `v = slope * i + intercept`.
///
/// A single point yields a flat line through it.
fn fit_line(history: &[f64]) -> (f64, f64) {
    let n = history.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = history.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &v) in history.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (v - mean_y);
        sxx += dx * dx;
    }

    if sxx == 0.0 {
        return (0.0, mean_y);
    }

    let slope = sxy / sxx;
    (slope, mean_y - slope * mean_x)
}
