use serde::{Deserialize, Serialize};

/// Kaplan-Meier survival curve for survival analysis.
///
/// The Kaplan-Meier estimator is a non-parametric statistic used to estimate the survival
/// function from lifetime data. It accounts for censored data (patients whose recurrence
/// had not been observed by the end of follow-up).
///
/// # Fields
///
/// The curve stores parallel vectors with one entry per distinct observed time,
/// whether an event or only censoring happened at that time:
/// - Observed time points (ascending)
/// - Survival probability just after each time point
/// - Number of subjects at risk at each time point
/// - Number of events (non-censored observations) at each time point
#[derive(Debug, Clone, PartialEq)]
pub struct KaplanMeierCurve {
    /// Distinct observed times, ascending.
    pub times: Vec<f64>,
    /// Survival probability at each corresponding time point.
    /// Values range from 0.0 (no survival) to 1.0 (complete survival).
    pub survival_prob: Vec<f64>,
    /// Number of subjects at risk (not yet experienced the event or censored) at each time point.
    pub at_risk: Vec<usize>,
    /// Number of events (non-censored observations) that occurred at each time point.
    pub events: Vec<usize>,
}

/// One point of a tabulated survival step function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurvivalPoint {
    pub time_days: f64,
    pub survival: f64,
}

impl KaplanMeierCurve {
    /// Computes the Kaplan-Meier survival curve from survival data.
    ///
    /// # Arguments
    ///
    /// * `data` - A vector of tuples where each tuple contains:
    ///   - `time`: The time at which the observation occurred
    ///   - `is_censored`: `true` if the observation was censored (event did not occur),
    ///     `false` if the event occurred
    ///
    /// # Examples
    ///
    /// ```
    /// # use nsmp_stats::survival::KaplanMeierCurve;
    /// let data = vec![(10.0, false), (20.0, true), (30.0, false)];
    /// let curve = KaplanMeierCurve::from_data(data);
    /// assert_eq!(curve.times, vec![10.0, 20.0, 30.0]);
    /// assert_eq!(curve.events, vec![1, 0, 1]);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_data(mut data: Vec<(f64, bool)>) -> Self {
        data.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut times = vec![];
        let mut survival_prob = vec![];
        let mut at_risk_vec = vec![];
        let mut events_vec = vec![];

        let mut current_survival = 1.0;
        let total = data.len();

        let mut i = 0;
        while i < data.len() {
            let current_time = data[i].0;
            let at_risk = total - i;

            let mut event_count = 0;
            let mut j = i;
            while j < data.len() && data[j].0 == current_time {
                if !data[j].1 {
                    event_count += 1;
                }
                j += 1;
            }

            if event_count > 0 {
                current_survival *= 1.0 - (event_count as f64 / at_risk as f64);
            }
            times.push(current_time);
            survival_prob.push(current_survival);
            at_risk_vec.push(at_risk);
            events_vec.push(event_count);

            i = j;
        }

        Self {
            times,
            survival_prob,
            at_risk: at_risk_vec,
            events: events_vec,
        }
    }

    /// Number of subjects the curve was estimated from.
    #[must_use]
    pub fn subject_count(&self) -> usize {
        self.at_risk.first().copied().unwrap_or(0)
    }

    /// Tabulates the full step function, starting at time zero.
    ///
    /// The first point is `(0, 1.0)` unless an observation exists at time zero,
    /// in which case that observation's point is used. Every distinct
    /// observed time follows, so censoring-only times appear as flat steps.
    #[must_use]
    pub fn step_points(&self) -> Vec<SurvivalPoint> {
        let mut points = Vec::with_capacity(self.times.len() + 1);
        if self.times.first().is_none_or(|t| *t > 0.0) {
            points.push(SurvivalPoint {
                time_days: 0.0,
                survival: 1.0,
            });
        }
        points.extend(
            self.times
                .iter()
                .zip(&self.survival_prob)
                .map(|(&time_days, &survival)| SurvivalPoint {
                    time_days,
                    survival,
                }),
        );
        points
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_empty_curve() {
        let curve = KaplanMeierCurve::from_data(vec![]);
        assert!(curve.times.is_empty());
        assert_eq!(curve.subject_count(), 0);
        assert_eq!(
            curve.step_points(),
            vec![SurvivalPoint {
                time_days: 0.0,
                survival: 1.0
            }]
        );
    }

    #[test]
    fn test_censoring_reduces_risk_set_only() {
        // 5 subjects: event@1, censored@2, event@3, event@3, censored@4
        let data = vec![
            (3.0, false),
            (1.0, false),
            (4.0, true),
            (2.0, true),
            (3.0, false),
        ];
        let curve = KaplanMeierCurve::from_data(data);
        assert_eq!(curve.times, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(curve.at_risk, vec![5, 4, 3, 1]);
        assert_eq!(curve.events, vec![1, 0, 2, 0]);
        assert_relative_eq!(curve.survival_prob[0], 0.8, epsilon = 1e-12);
        assert_relative_eq!(curve.survival_prob[1], 0.8, epsilon = 1e-12);
        assert_relative_eq!(curve.survival_prob[2], 0.8 * (1.0 / 3.0), epsilon = 1e-12);
        assert_relative_eq!(curve.survival_prob[3], 0.8 * (1.0 / 3.0), epsilon = 1e-12);
    }

    #[test]
    fn test_step_points_are_non_increasing() {
        let data = vec![(30.0, false), (60.0, true), (90.0, false), (400.0, false)];
        let points = KaplanMeierCurve::from_data(data).step_points();
        assert_eq!(points.first().unwrap().time_days, 0.0);
        assert!(points.windows(2).all(|w| w[0].survival >= w[1].survival));
        assert!(points.windows(2).all(|w| w[0].time_days < w[1].time_days));
    }

    #[test]
    fn test_event_at_time_zero_is_not_duplicated() {
        let points = KaplanMeierCurve::from_data(vec![(0.0, false), (5.0, true)]).step_points();
        assert_eq!(points.len(), 2);
        assert_relative_eq!(points[0].survival, 0.5, epsilon = 1e-12);
    }
}
