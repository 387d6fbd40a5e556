//! Cox scoring of a single patient.

use std::{borrow::Cow, fmt, num::NonZeroUsize, thread};

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap as _,
};

use crate::{
    InferenceError, PredictError,
    artifacts::CoxArtifacts,
    record::PatientRecord,
    risk::RiskGroup,
    schema::DesignRow,
    summary,
};

/// Survival horizons in days: 1, 3 and 5 years.
pub const SURVIVAL_HORIZONS_DAYS: [f64; 3] = [365.0, 3.0 * 365.0, 5.0 * 365.0];

/// Number of contributions reported per prediction.
pub const TOP_CONTRIBUTORS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoxPrediction {
    /// Partial hazard relative to the training mean.
    pub risk_score: f64,
    pub risk_group: RiskGroup,
    pub dfs_prob_1y: f64,
    pub dfs_prob_3y: f64,
    pub dfs_prob_5y: f64,
    pub top_contributors: Contributions,
}

/// Signed per-column contributions `value × coefficient`, largest magnitude
/// first. Serialized as a JSON object in rank order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contributions(pub Vec<(String, f64)>);

impl Contributions {
    /// Ranks every column of `row` and keeps the first `limit`.
    ///
    /// Ties keep schema order.
    #[must_use]
    pub fn rank(row: &DesignRow<'_>, coefficients: &[f64], limit: usize) -> Self {
        let mut all: Vec<_> = row
            .iter()
            .zip(coefficients)
            .map(|((name, x), beta)| (name.to_owned(), x * beta))
            .collect();
        all.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        all.truncate(limit);
        Self(all)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl Serialize for Contributions {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Contributions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ContributionsVisitor;

        impl<'de> Visitor<'de> for ContributionsVisitor {
            type Value = Contributions;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column name to contribution")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry()? {
                    entries.push(entry);
                }
                Ok(Contributions(entries))
            }
        }

        deserializer.deserialize_map(ContributionsVisitor)
    }
}

/// Scores one patient record.
pub fn predict(record: &PatientRecord, artifacts: &CoxArtifacts) -> Result<CoxPrediction, PredictError> {
    let record = if artifacts.preprocess.summarized_features {
        Cow::Owned(summary::summarize(record)?)
    } else {
        Cow::Borrowed(record)
    };
    let row = artifacts.preprocessor().transform(&record)?;
    let model = &artifacts.model;
    let score = model.partial_hazard(row.values())?;

    let [dfs_prob_1y, dfs_prob_3y, dfs_prob_5y] = survival_at_horizons(artifacts, score)?;
    let risk_group = artifacts.thresholds.classify(score);
    let top_contributors = Contributions::rank(&row, &model.coefficients, TOP_CONTRIBUTORS);

    tracing::debug!(score, %risk_group, "cox prediction");
    Ok(CoxPrediction {
        risk_score: score,
        risk_group,
        dfs_prob_1y,
        dfs_prob_3y,
        dfs_prob_5y,
        top_contributors,
    })
}

fn survival_at_horizons(artifacts: &CoxArtifacts, score: f64) -> Result<[f64; 3], InferenceError> {
    let mut probs = [0.0; 3];
    for (prob, &time_days) in probs.iter_mut().zip(&SURVIVAL_HORIZONS_DAYS) {
        *prob = artifacts.model.survival_at(time_days, score)?;
    }
    Ok(probs)
}

/// Scores many records against the same artifacts in parallel.
///
/// Results are returned in input order; a failing record does not affect the
/// others.
pub fn predict_batch(
    records: &[PatientRecord],
    artifacts: &CoxArtifacts,
) -> Vec<Result<CoxPrediction, PredictError>> {
    let workers = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    let chunk_size = records.len().div_ceil(workers).max(1);

    thread::scope(|s| {
        let handles: Vec<_> = records
            .chunks(chunk_size)
            .map(|chunk| {
                s.spawn(move || {
                    chunk
                        .iter()
                        .map(|record| predict(record, artifacts))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(results) => results,
                Err(payload) => std::panic::resume_unwind(payload),
            })
            .collect()
    })
}
