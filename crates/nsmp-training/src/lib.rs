//! Offline training of the NSMP Cox recurrence model.
//!
//! The trainer turns a labeled cohort into the [`CoxArtifacts`] bundle the
//! online predictor loads. Every step that learns something from data only
//! looks at the training split.
//!
//! # Pipeline
//!
//! ```text
//! Cohort (records + time_days + event)
//!     ↓ optional summary features
//!     ↓ seeded 80/20 split (not stratified)
//! train split ──→ medians, categorical levels → ColumnSchema
//!     ↓ impute + one-hot + reindex (train and test)
//! design matrices
//!     ↓ penalized Cox fit (Efron ties)
//! CoxModel
//!     ↓ train partial hazards
//! tertile thresholds → risk groups → Kaplan-Meier curves per group
//!     ↓
//! CoxArtifacts
//! ```
//!
//! The [`diagnostics`] module reuses the same split, medians and encoding to
//! report held-out concordance and a penalizer sensitivity sweep.
//!
//! # Example
//!
//! ```rust,ignore
//! use nsmp_training::{cohort::Cohort, config::TrainingConfig, trainer};
//!
//! let cohort: Cohort = serde_json::from_reader(reader)?;
//! let features = vec!["edad".to_owned(), "grado_histologi".to_owned()];
//! let artifacts = trainer::fit(&cohort, &features, &TrainingConfig::default())?;
//! artifacts.save("artifacts")?;
//! ```
//!
//! [`CoxArtifacts`]: nsmp_cox::artifacts::CoxArtifacts

use nsmp_cox::{InferenceError, SchemaError, fit::FitError, schema::ColumnSchemaError};

pub mod cohort;
pub mod config;
pub mod diagnostics;
pub mod encoding;
pub mod split;
pub mod trainer;

/// Failure of an offline training run.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum TrainingError {
    #[display("cohort is empty")]
    EmptyCohort,
    #[display("cohort row {row} has invalid time_days {time_days}")]
    InvalidTime { row: usize, time_days: f64 },
    #[display("test fraction {fraction} is outside [0, 1)")]
    InvalidTestFraction { fraction: f64 },
    #[display("training split has {rows} rows; at least 2 are required")]
    TooFewRows { rows: usize },
    #[display("feature '{feature}' has no observed values in the training split")]
    NoObservedValues { feature: String },
    #[display("cohort row {row}: {source}")]
    Schema { row: usize, source: SchemaError },
    #[display("{_0}")]
    ColumnSchema(ColumnSchemaError),
    #[display("cox model fit failed: {_0}")]
    Fit(FitError),
    #[display("{_0}")]
    Inference(InferenceError),
    #[display("fit with penalizer {penalizer} failed: {source}")]
    PenalizerFit {
        penalizer: f64,
        source: Box<TrainingError>,
    },
    #[display("trained artifacts are inconsistent: {reason}")]
    InvalidArtifacts { reason: String },
}

impl From<ColumnSchemaError> for TrainingError {
    fn from(e: ColumnSchemaError) -> Self {
        Self::ColumnSchema(e)
    }
}

impl From<FitError> for TrainingError {
    fn from(e: FitError) -> Self {
        Self::Fit(e)
    }
}

impl From<InferenceError> for TrainingError {
    fn from(e: InferenceError) -> Self {
        Self::Inference(e)
    }
}

#[cfg(test)]
mod testing;
