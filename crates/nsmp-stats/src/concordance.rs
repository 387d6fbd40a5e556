//! Harrell's concordance index.
//!
//! The C-index measures how well a predictor ranks subjects by their observed
//! survival times. A pair of subjects is *comparable* when the one with the
//! shorter time had an observed event (or both share a time and only the
//! first had the event). The pair is *concordant* when the predictor also
//! ranks the shorter-lived subject lower. Tied predictions count as half.
//!
//! Predictions follow the "higher means longer survival" convention, so a
//! hazard score must be negated before it is passed in.

/// Computes Harrell's C-index.
///
/// # Arguments
///
/// * `times` - Observed (event or censoring) times
/// * `predicted` - Predicted values, higher meaning longer expected survival
/// * `events` - `true` when the event was observed, `false` when censored
///
/// # Returns
///
/// `None` when the slices have different lengths or no pair is comparable.
///
/// # Examples
///
/// ```
/// use nsmp_stats::concordance::concordance_index;
///
/// let times = [1.0, 2.0, 3.0];
/// let events = [true, true, false];
/// // Perfect ranking
/// assert_eq!(concordance_index(&times, &[1.0, 2.0, 3.0], &events), Some(1.0));
/// // Reversed ranking
/// assert_eq!(concordance_index(&times, &[3.0, 2.0, 1.0], &events), Some(0.0));
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn concordance_index(times: &[f64], predicted: &[f64], events: &[bool]) -> Option<f64> {
    if times.len() != predicted.len() || times.len() != events.len() {
        return None;
    }

    let mut concordant = 0.0;
    let mut comparable = 0_usize;
    for i in 0..times.len() {
        if !events[i] {
            continue;
        }
        for j in 0..times.len() {
            if i == j {
                continue;
            }
            let shorter = times[i] < times[j] || (times[i] == times[j] && !events[j]);
            if !shorter {
                continue;
            }
            comparable += 1;
            if predicted[i] < predicted[j] {
                concordant += 1.0;
            } else if predicted[i] == predicted[j] {
                concordant += 0.5;
            }
        }
    }

    (comparable > 0).then(|| concordant / comparable as f64)
}
