//! Cox proportional-hazards model for NSMP endometrial-cancer recurrence.
//!
//! This crate holds everything the online Cox predictor needs, plus the fitting
//! engine used by the offline trainer:
//!
//! - [`record`]: typed patient records with an explicit missing marker
//! - [`schema`]: the ordered, explicit column schema of the design matrix
//! - [`preprocess`]: imputation, one-hot encoding and reindexing of one record
//! - [`model`]: the fitted model (coefficients, centering, baseline hazard)
//! - [`fit`]: penalized partial-likelihood fitting (Efron ties)
//! - [`risk`]: risk-group thresholds and classification
//! - [`artifacts`]: the immutable artifact bundle and its on-disk layout
//! - [`predictor`]: scoring, survival lookup and contribution ranking
//! - [`summary`]: derived summary features (nodal / genetic flags)
//! - [`fields`]: the declared patient input fields
//!
//! # Serving flow
//!
//! ```text
//! PatientRecord
//!     ↓ preprocess (medians, one-hot, reindex onto ColumnSchema)
//! DesignRow
//!     ↓ CoxModel (partial hazard, baseline cumulative hazard)
//! score + survival at 1/3/5 years
//!     ↓ RiskThresholds
//! CoxPrediction
//! ```
//!
//! Artifacts are loaded once with [`artifacts::CoxArtifacts::load`] and passed
//! by reference to every prediction. Nothing in this crate holds global state.

pub mod artifacts;
pub mod fields;
pub mod fit;
pub mod model;
pub mod predictor;
pub mod preprocess;
pub mod record;
pub mod risk;
pub mod schema;
pub mod summary;

#[cfg(test)]
mod testing;

use std::{io, path::PathBuf};

/// A patient record that cannot be coerced into the model's feature schema.
///
/// Surfaced to callers as a client-side failure.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SchemaError {
    #[display("feature '{feature}' expects a numeric value, got '{value}'")]
    NotNumeric { feature: String, value: String },
    #[display("required field '{field}' is missing")]
    MissingRequired { field: String },
    #[display("field '{field}' value {value} is out of range: {reason}")]
    OutOfRange {
        field: String,
        value: f64,
        reason: String,
    },
}

/// The statistical engine could not produce a result for a prediction.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum InferenceError {
    #[display("partial hazard is not finite ({score})")]
    NonFiniteScore { score: f64 },
    #[display("survival at {time_days} days is not a probability ({value})")]
    InvalidSurvival { time_days: f64, value: f64 },
    #[display("design row has {actual} columns but the model expects {expected}")]
    WidthMismatch { expected: usize, actual: usize },
}

/// Failure of a single Cox prediction request.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum PredictError {
    #[display("{_0}")]
    Schema(SchemaError),
    #[display("{_0}")]
    Inference(InferenceError),
}

impl PredictError {
    /// Whether the failure was caused by the request rather than the engine.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Schema(_))
    }
}

/// Reading, writing or validating persisted artifacts failed.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ArtifactError {
    #[display("failed to access {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to (de)serialize {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("invalid artifact {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}
