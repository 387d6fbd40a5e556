//! Held-out concordance and penalizer sensitivity.
//!
//! Both checks reuse the trainer's split and train-only encoding, so their
//! numbers describe the same model family that [`trainer::fit`] produces.
//!
//! [`trainer::fit`]: crate::trainer::fit

use serde::{Deserialize, Serialize};

use crate::{
    TrainingError,
    cohort::Cohort,
    config::TrainingConfig,
    trainer::{self, Prepared},
};

/// Penalizer strengths compared by [`penalizer_sweep`].
pub const PENALIZER_GRID: [f64; 3] = [0.01, 0.1, 0.5];

/// Held-out concordance of one penalizer strength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenalizerResult {
    pub penalizer: f64,
    /// `None` when the test split has no comparable pair.
    #[serde(rename = "C_index")]
    pub c_index: Option<f64>,
}

/// Output of a validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub seed: u64,
    pub n_train: usize,
    pub n_test: usize,
    pub n_events_train: usize,
    pub penalizer: f64,
    /// Harrell's C of the configured model on the test split.
    pub concordance: Option<f64>,
    pub penalizer_sweep: Vec<PenalizerResult>,
}

/// Held-out concordance of the model fitted with `config`.
pub fn concordance_check(
    prepared: &Prepared,
    config: &TrainingConfig,
) -> Result<Option<f64>, TrainingError> {
    let model = trainer::fit_model(prepared, config)?;
    trainer::concordance(&model, &prepared.test)
}

/// Refits with each penalizer in `grid` and reports its held-out concordance.
///
/// The first failing fit aborts the sweep and names its penalizer.
pub fn penalizer_sweep(
    prepared: &Prepared,
    config: &TrainingConfig,
    grid: &[f64],
) -> Result<Vec<PenalizerResult>, TrainingError> {
    grid.iter()
        .map(|&penalizer| {
            let c_index = concordance_check(prepared, &config.with_penalizer(penalizer))
                .map_err(|source| TrainingError::PenalizerFit {
                    penalizer,
                    source: Box::new(source),
                })?;
            tracing::info!(penalizer, ?c_index, "penalizer sweep");
            Ok(PenalizerResult { penalizer, c_index })
        })
        .collect()
}

/// Runs the concordance check and the penalizer sweep over [`PENALIZER_GRID`].
pub fn validate(
    cohort: &Cohort,
    features: &[String],
    config: &TrainingConfig,
) -> Result<ValidationReport, TrainingError> {
    let prepared = trainer::prepare(cohort, features, config)?;
    let concordance = concordance_check(&prepared, config)?;
    let penalizer_sweep = penalizer_sweep(&prepared, config, &PENALIZER_GRID)?;
    Ok(ValidationReport {
        seed: config.seed,
        n_train: prepared.train.len(),
        n_test: prepared.test.len(),
        n_events_train: prepared.train.events.iter().filter(|&&e| e).count(),
        penalizer: config.penalizer,
        concordance,
        penalizer_sweep,
    })
}
