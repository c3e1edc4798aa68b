/// Nearest-rank percentile of an ascending slice.
///
/// Returns the smallest observed value with at least `p` of the population at
/// or below it: index `ceil(p * n) - 1`, clamped to the slice. Always an
/// element of the input, never an interpolation.
pub fn nearest_rank(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    let rank = (p * n as f64).ceil() as usize;
    let idx = rank.saturating_sub(1).min(n - 1);
    Some(sorted[idx])
}

/// Lower and upper percentiles of `values`, computed from one sort.
pub fn bounds(mut values: Vec<f64>, lower: f64, upper: f64) -> Option<(f64, f64)> {
    values.sort_by(|a, b| a.total_cmp(b));
    Some((nearest_rank(&values, lower)?, nearest_rank(&values, upper)?))
}
