//! The fitted Cox proportional-hazards model.

use ndarray::{ArrayView1, Zip};
use serde::{Deserialize, Serialize};

use crate::InferenceError;

/// One step of the Breslow baseline cumulative hazard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardPoint {
    pub time_days: f64,
    pub cumulative_hazard: f64,
}

/// Fit statistics recorded alongside the coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub penalizer: f64,
    /// Unpenalized partial log-likelihood at the optimum.
    pub log_likelihood: f64,
    pub iterations: usize,
    pub n_observations: usize,
    pub n_events: usize,
    /// Harrell's C on the held-out split, when it was computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub held_out_concordance: Option<f64>,
}

/// Coefficients on the original covariate scale, the covariate means used
/// for centering, and the baseline cumulative hazard.
///
/// The partial hazard of a row `x` is `exp((x - means) · coefficients)` and
/// its survival at `t` is `exp(-H0(t) · partial_hazard)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoxModel {
    pub columns: Vec<String>,
    pub coefficients: Vec<f64>,
    pub means: Vec<f64>,
    /// Sorted by time; one entry per distinct observed time.
    pub baseline_cumulative_hazard: Vec<HazardPoint>,
    pub summary: FitSummary,
}

impl CoxModel {
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Checks internal consistency of a deserialized model.
    pub fn validate(&self) -> Result<(), String> {
        let width = self.width();
        if self.coefficients.len() != width || self.means.len() != width {
            return Err(format!(
                "{width} columns but {} coefficients and {} means",
                self.coefficients.len(),
                self.means.len()
            ));
        }
        if self
            .coefficients
            .iter()
            .chain(&self.means)
            .any(|v| !v.is_finite())
        {
            return Err("non-finite coefficient or mean".to_owned());
        }
        let sorted = self.baseline_cumulative_hazard.windows(2).all(|w| {
            w[0].time_days < w[1].time_days && w[0].cumulative_hazard <= w[1].cumulative_hazard
        });
        if !sorted {
            return Err("baseline cumulative hazard is not a non-decreasing step function".to_owned());
        }
        Ok(())
    }

    /// `(x - means) · coefficients`
    pub fn linear_predictor(&self, row: ArrayView1<'_, f64>) -> Result<f64, InferenceError> {
        if row.len() != self.width() {
            return Err(InferenceError::WidthMismatch {
                expected: self.width(),
                actual: row.len(),
            });
        }
        let means = ArrayView1::from(&self.means);
        let beta = ArrayView1::from(&self.coefficients);
        Ok(Zip::from(&row)
            .and(&means)
            .and(&beta)
            .fold(0.0, |acc, &x, &m, &b| acc + (x - m) * b))
    }

    /// `exp` of the linear predictor.
    pub fn partial_hazard(&self, row: ArrayView1<'_, f64>) -> Result<f64, InferenceError> {
        let score = self.linear_predictor(row)?.exp();
        if score.is_finite() {
            Ok(score)
        } else {
            Err(InferenceError::NonFiniteScore { score })
        }
    }

    /// Baseline cumulative hazard `H0(t)`.
    ///
    /// Right-continuous step function: `0` before the first observed time and
    /// the last value after the last observed time.
    #[must_use]
    pub fn cumulative_hazard_at(&self, time_days: f64) -> f64 {
        let idx = self
            .baseline_cumulative_hazard
            .partition_point(|p| p.time_days <= time_days);
        idx.checked_sub(1)
            .map_or(0.0, |i| self.baseline_cumulative_hazard[i].cumulative_hazard)
    }

    /// Survival probability at `time_days` for a row with the given partial
    /// hazard.
    pub fn survival_at(&self, time_days: f64, partial_hazard: f64) -> Result<f64, InferenceError> {
        let value = (-self.cumulative_hazard_at(time_days) * partial_hazard).exp();
        if (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(InferenceError::InvalidSurvival { time_days, value })
        }
    }
}
