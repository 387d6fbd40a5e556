//! Imputation medians and one-hot column schema learned from the training
//! split, and the design matrices built with them.

use std::collections::BTreeMap;

use ndarray::Array2;
use nsmp_cox::{
    preprocess::Preprocessor,
    record::FeatureValue,
    schema::{Column, ColumnSchema},
};
use nsmp_stats::descriptive::DescriptiveStats;

use crate::{TrainingError, cohort::CohortRow, config::TrainingConfig};

/// Encoding rules fitted on the training split.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoding {
    pub final_features: Vec<String>,
    pub medians: BTreeMap<String, f64>,
    pub schema: ColumnSchema,
}

/// Rows of one partition as fit inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub times: Vec<f64>,
    pub events: Vec<bool>,
}

impl Dataset {
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

impl Encoding {
    /// Learns medians and the column schema from `train`.
    ///
    /// A feature is numeric when every observed value is a number and it is
    /// not listed in [`TrainingConfig::categorical`]. Numeric columns come
    /// first in feature order, followed by the indicator columns of each
    /// categorical feature. Levels are sorted (numerically when every level is
    /// a number) and the first level is dropped as the reference.
    pub fn learn(
        train: &[&CohortRow],
        features: &[String],
        config: &TrainingConfig,
    ) -> Result<Self, TrainingError> {
        let mut medians = BTreeMap::new();
        let mut numeric_columns = Vec::new();
        let mut indicator_columns = Vec::new();

        for feature in features {
            let observed: Vec<&FeatureValue> = train
                .iter()
                .map(|row| row.features.get(feature))
                .filter(|v| !is_missing(v))
                .collect();
            let numeric = !config.is_categorical(feature)
                && observed
                    .iter()
                    .all(|v| matches!(v, FeatureValue::Number(_) | FeatureValue::Bool(_)));

            if numeric {
                let values = observed.iter().filter_map(|v| v.to_number().ok().flatten());
                let stats = DescriptiveStats::new(values).ok_or_else(|| {
                    TrainingError::NoObservedValues {
                        feature: feature.clone(),
                    }
                })?;
                medians.insert(feature.clone(), stats.median);
                numeric_columns.push(Column::numeric(feature));
            } else {
                let levels = sorted_levels(&observed);
                tracing::debug!(feature = %feature, ?levels, "categorical levels");
                indicator_columns.extend(
                    levels
                        .iter()
                        .skip(1)
                        .map(|level| Column::indicator(feature, level)),
                );
            }
        }

        numeric_columns.extend(indicator_columns);
        let schema = ColumnSchema::new(numeric_columns)?;
        Ok(Self {
            final_features: features.to_vec(),
            medians,
            schema,
        })
    }

    #[must_use]
    pub fn preprocessor(&self) -> Preprocessor<'_> {
        Preprocessor::new(&self.final_features, &self.medians, &self.schema)
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.schema.names().map(str::to_owned).collect()
    }

    /// Encodes `rows` into a design matrix aligned to the schema.
    pub fn dataset(&self, rows: &[&CohortRow]) -> Result<Dataset, TrainingError> {
        let preprocessor = self.preprocessor();
        let mut x = Array2::zeros((rows.len(), self.schema.len()));
        for (i, row) in rows.iter().enumerate() {
            let design = preprocessor
                .transform(&row.features)
                .map_err(|source| TrainingError::Schema { row: i, source })?;
            x.row_mut(i).assign(&design.values());
        }
        Ok(Dataset {
            x,
            times: rows.iter().map(|r| r.time_days).collect(),
            events: rows.iter().map(|r| r.event).collect(),
        })
    }
}

fn is_missing(value: &FeatureValue) -> bool {
    match value {
        FeatureValue::Missing => true,
        FeatureValue::Number(n) => n.is_nan(),
        FeatureValue::Bool(_) | FeatureValue::Text(_) => false,
    }
}

/// Distinct level labels, sorted numerically when all observed values are
/// numbers and lexicographically otherwise.
fn sorted_levels(observed: &[&FeatureValue]) -> Vec<String> {
    let all_numeric = observed
        .iter()
        .all(|v| matches!(v, FeatureValue::Number(_) | FeatureValue::Bool(_)));
    let mut levels: Vec<(f64, String)> = Vec::new();
    for value in observed {
        let Some(label) = value.level_label() else {
            continue;
        };
        if levels.iter().any(|(_, l)| *l == label) {
            continue;
        }
        let key = if all_numeric {
            value.to_number().ok().flatten().unwrap_or(f64::NAN)
        } else {
            0.0
        };
        levels.push((key, label));
    }
    if all_numeric {
        levels.sort_by(|a, b| a.0.total_cmp(&b.0));
    } else {
        levels.sort_by(|a, b| a.1.cmp(&b.1));
    }
    levels.into_iter().map(|(_, label)| label).collect()
}
