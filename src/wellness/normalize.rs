/// Score returned whenever a channel cannot be compared to its baseline.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Logistic squashing into (0, 1).
fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Bounded [0, 1] score of `value` relative to a baseline mean/std.
///
/// Missing or non-finite inputs and a non-positive std return 0.5. `invert`
/// negates the z-score for channels where elevation means calm.
pub fn normalize(
    value: Option<f64>,
    baseline_mean: Option<f64>,
    baseline_std: Option<f64>,
    invert: bool,
) -> f64 {
    let (Some(value), Some(mean), Some(std)) = (value, baseline_mean, baseline_std) else {
        return NEUTRAL_SCORE;
    };
    if !value.is_finite() || !mean.is_finite() || !std.is_finite() || std <= 0.0 {
        return NEUTRAL_SCORE;
    }

    let z = (value - mean) / std;
    let z = if invert { -z } else { z };
    sigmoid(z)
}
