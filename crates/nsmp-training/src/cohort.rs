//! Labeled training cohort.

use nsmp_cox::{SchemaError, record::PatientRecord, summary};
use serde::{Deserialize, Deserializer, Serialize};

use crate::TrainingError;

/// One patient with follow-up.
///
/// Serialized flat: `time_days` and `event` sit next to the feature values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRow {
    /// Days until recurrence or censoring.
    pub time_days: f64,
    /// `true` if recurrence was observed. Accepts booleans or `0`/`1`.
    #[serde(deserialize_with = "deserialize_event")]
    pub event: bool,
    #[serde(flatten)]
    pub features: PatientRecord,
}

fn deserialize_event<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum EventFlag {
        Bool(bool),
        Number(f64),
    }

    Ok(match EventFlag::deserialize(deserializer)? {
        EventFlag::Bool(b) => b,
        EventFlag::Number(n) => n != 0.0,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cohort {
    rows: Vec<CohortRow>,
}

impl Cohort {
    pub fn new(rows: Vec<CohortRow>) -> Result<Self, TrainingError> {
        let cohort = Self { rows };
        cohort.validate()?;
        Ok(cohort)
    }

    /// Rejects empty cohorts and negative or non-finite follow-up times.
    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.rows.is_empty() {
            return Err(TrainingError::EmptyCohort);
        }
        for (row, r) in self.rows.iter().enumerate() {
            if !(r.time_days.is_finite() && r.time_days >= 0.0) {
                return Err(TrainingError::InvalidTime {
                    row,
                    time_days: r.time_days,
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn rows(&self) -> &[CohortRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.rows.iter().filter(|r| r.event).count()
    }

    /// Adds the derived summary flags to every row.
    pub fn summarized(&self) -> Result<Self, TrainingError> {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(row, r)| {
                Ok(CohortRow {
                    features: summary::summarize(&r.features)
                        .map_err(|source: SchemaError| TrainingError::Schema { row, source })?,
                    ..r.clone()
                })
            })
            .collect::<Result<_, TrainingError>>()?;
        Ok(Self { rows })
    }
}
