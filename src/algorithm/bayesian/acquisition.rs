//! Expected improvement and the normal distribution helpers it needs.

use crate::types::Direction;

/// Standard normal PDF.
pub(crate) fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF (Hart / Abramowitz-Stegun rational approximation).
pub(crate) fn norm_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let abs_x = x.abs();
    let t = 1.0 / (1.0 + 0.231_641_9 * abs_x);
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;
    let t5 = t4 * t;

    let poly = 0.319_381_530 * t - 0.356_563_782 * t2 + 1.781_477_937 * t3 - 1.821_255_978 * t4
        + 1.330_274_429 * t5;
    let cdf = 1.0 - norm_pdf(abs_x) * poly;

    if x >= 0.0 { cdf } else { 1.0 - cdf }
}

/// Expected improvement of a posterior `(mean, std)` over `best`.
///
/// `EI = s (mean - best - epsilon) Φ(s (mean - best - epsilon) / std)` with
/// `s = +1` when maximizing and `s = -1` when minimizing. With zero
/// predictive spread the improvement is deterministic:
/// `max(s (mean - best - epsilon), 0)`.
///
/// ```
/// use hpsweep::algorithm::bayesian::expected_improvement;
/// use hpsweep::Direction;
///
/// assert_eq!(expected_improvement(1.0, 0.5, 1.0, 0.0, Direction::Minimize), 0.0);
/// assert!(expected_improvement(0.2, 0.5, 1.0, 0.0, Direction::Minimize) > 0.0);
/// ```
#[must_use]
pub fn expected_improvement(mean: f64, std: f64, best: f64, epsilon: f64, direction: Direction) -> f64 {
    let s = match direction {
        Direction::Maximize => 1.0,
        Direction::Minimize => -1.0,
    };
    let gain = s * (mean - best - epsilon);
    if std <= 0.0 || !std.is_finite() {
        return gain.max(0.0);
    }
    gain * norm_cdf(gain / std)
}
