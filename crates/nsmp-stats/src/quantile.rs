//! Empirical quantiles.

/// Computes a single linearly-interpolated quantile from sorted data.
///
/// The quantile is clamped to `[0, 1]`. Returns `f64::NAN` if the input is
/// empty.
///
/// # Examples
///
/// ```
/// use nsmp_stats::quantile::compute_quantile;
///
/// let values = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert_eq!(compute_quantile(&values, 0.5), 3.0);
/// assert_eq!(compute_quantile(&values, 0.25), 2.0);
/// assert_eq!(compute_quantile(&values, 0.625), 3.5);
/// assert_eq!(compute_quantile(&values, 1.0), 5.0);
/// ```
#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn compute_quantile(sorted_values: &[f64], quantile: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }
    let last = sorted_values.len() - 1;
    let position = quantile.clamp(0.0, 1.0) * last as f64;
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(last);
    let fraction = position - lower as f64;
    let (a, b) = (sorted_values[lower], sorted_values[upper]);
    if fraction == 0.0 {
        a
    } else {
        a + (b - a) * fraction
    }
}
