/// Generate a random `f64` in the range `[low, high)`.
#[inline]
pub(crate) fn f64_range(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + rng.f64() * (high - low)
}

/// Pick an index with probability proportional to `weights`.
///
/// Non-finite and negative weights count as zero. Falls back to a uniform
/// pick when every weight is zero.
pub(crate) fn weighted_index(rng: &mut fastrand::Rng, weights: &[f64]) -> usize {
    let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
    let total: f64 = weights.iter().copied().map(clean).sum();
    if total <= 0.0 {
        return rng.usize(0..weights.len());
    }
    let mut target = rng.f64() * total;
    for (i, &w) in weights.iter().enumerate() {
        target -= clean(w);
        if target < 0.0 {
            return i;
        }
    }
    weights.len() - 1
}
