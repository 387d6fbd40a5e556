//! Discrete Bayesian network for NSMP recurrence queries.
//!
//! The network is trained elsewhere and loaded here as a frozen JSON artifact.
//! This crate answers posterior queries over it with exact variable
//! elimination.
//!
//! - [`network`]: the network artifact, its tabular CPDs and load-time checks
//! - [`factor`]: tabular factors (reduce, product, marginalize)
//! - [`inference`]: variable elimination with barren-node pruning
//! - [`evidence`]: raw patient values to evidence state strings
//! - [`predictor`]: the `recidiva` prediction and multi-target queries
//! - [`graph`]: nodes, edges and model summary for clients
//! - [`fields`]: the declared evidence fields and queryable targets
//!
//! # Query flow
//!
//! ```text
//! EvidenceRecord (JSON values, null = missing)
//!     ↓ stringify, keep network nodes only
//! Evidence (node → state)
//!     ↓ prune to ancestors, reduce CPDs, eliminate (min-fill)
//! Distribution over the target's declared states
//! ```

pub mod evidence;
pub mod factor;
pub mod fields;
pub mod graph;
pub mod inference;
pub mod network;
pub mod ordered;
pub mod predictor;

#[cfg(test)]
mod testing;

use std::{io, path::PathBuf};

/// The network artifact could not be read or is structurally inconsistent.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum NetworkError {
    #[display("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("variable '{name}' is declared more than once")]
    DuplicateVariable { name: String },
    #[display("variable '{variable}' declares no states")]
    NoStates { variable: String },
    #[display("variable '{variable}' declares state '{state}' more than once")]
    DuplicateState { variable: String, state: String },
    #[display("variable '{variable}' has unknown parent '{parent}'")]
    UnknownParent { variable: String, parent: String },
    #[display(
        "CPD of '{variable}' must be {expected_rows}x{expected_columns}, found {rows} rows with a {columns}-column row"
    )]
    TableShape {
        variable: String,
        expected_rows: usize,
        expected_columns: usize,
        rows: usize,
        columns: usize,
    },
    #[display("CPD of '{variable}' has invalid probability {value}")]
    InvalidProbability { variable: String, value: f64 },
    #[display("CPD column {column} of '{variable}' sums to {sum}, not 1")]
    ColumnSum {
        variable: String,
        column: usize,
        sum: f64,
    },
}

/// Evidence that does not fit the network's declared states.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SchemaError {
    #[display("'{state}' is not a state of '{variable}' (expected one of {allowed:?})")]
    UnknownState {
        variable: String,
        state: String,
        allowed: Vec<String>,
    },
    #[display("required field '{field}' is missing")]
    MissingRequired { field: String },
}

/// A query named a variable that is not a node of the network.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("target '{target}' is not a valid node in the network")]
pub struct UnknownTargetError {
    pub target: String,
}

/// Variable elimination could not produce a posterior.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum InferenceError {
    #[display("evidence has zero probability under the network (target '{target}')")]
    ImpossibleEvidence { target: String },
    #[display("posterior of '{target}' is not finite (normalizer {normalizer})")]
    NonFinite { target: String, normalizer: f64 },
    #[display("variable '{variable}' is both queried and observed")]
    TargetInEvidence { variable: String },
}

/// Failure of a single Bayesian query.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum QueryError {
    #[display("{_0}")]
    Schema(SchemaError),
    #[display("{_0}")]
    UnknownTarget(UnknownTargetError),
    #[display("{_0}")]
    Inference(InferenceError),
}

impl QueryError {
    /// Whether the failure was caused by the request rather than the engine.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Schema(_)
                | Self::UnknownTarget(_)
                | Self::Inference(InferenceError::TargetInEvidence { .. })
        )
    }
}
