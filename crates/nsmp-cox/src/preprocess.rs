//! Turns a raw [`PatientRecord`] into a [`DesignRow`].

use std::collections::BTreeMap;

use crate::{
    SchemaError,
    record::{FeatureValue, PatientRecord},
    schema::{ColumnSchema, DesignRow, indicator_name},
};

/// Imputation and encoding rules fixed at training time.
///
/// Borrowed from the artifact bundle at serve time and from the trainer's
/// working state during fitting, so both sides encode rows identically.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor<'a> {
    final_features: &'a [String],
    medians: &'a BTreeMap<String, f64>,
    schema: &'a ColumnSchema,
}

impl<'a> Preprocessor<'a> {
    #[must_use]
    pub fn new(
        final_features: &'a [String],
        medians: &'a BTreeMap<String, f64>,
        schema: &'a ColumnSchema,
    ) -> Self {
        Self {
            final_features,
            medians,
            schema,
        }
    }

    #[must_use]
    pub fn schema(&self) -> &'a ColumnSchema {
        self.schema
    }

    /// Encodes one record.
    ///
    /// Only `final_features` are read. Median-tracked (and otherwise numeric)
    /// features are cast to numbers with missing values replaced by the
    /// median. Remaining features activate the indicator column of their
    /// level; the reference level and missing values encode as all zeros.
    pub fn transform(&self, record: &PatientRecord) -> Result<DesignRow<'a>, SchemaError> {
        let mut entries = Vec::with_capacity(self.final_features.len());
        for feature in self.final_features {
            let value = record.get(feature);
            if let Some(x) = self.numeric_value(feature, value)? {
                entries.push((feature.clone(), x));
            } else if let Some(level) = value.level_label() {
                entries.push((indicator_name(feature, &level), 1.0));
            }
        }
        Ok(self.schema.reindex(entries))
    }

    /// The imputed number for a numeric feature, `None` for categorical ones.
    fn numeric_value(&self, feature: &str, value: &FeatureValue) -> Result<Option<f64>, SchemaError> {
        let median = self.medians.get(feature).copied();
        if median.is_none() && !self.schema.is_numeric(feature) {
            return Ok(None);
        }
        let number = value.to_number().map_err(|text| SchemaError::NotNumeric {
            feature: feature.to_owned(),
            value: text.to_owned(),
        })?;
        number
            .or(median)
            .map(Some)
            .ok_or_else(|| SchemaError::MissingRequired {
                field: feature.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(names: &[&str]) -> Vec<String> {
        names.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn test_median_and_indicator_example() {
        let final_features = features(&["edad", "grado_histologi"]);
        let medians = BTreeMap::from([("edad".to_owned(), 55.0)]);
        let schema = ColumnSchema::resolve(&final_features, &["edad", "grado_histologi_2"]).unwrap();
        let pre = Preprocessor::new(&final_features, &medians, &schema);

        let record = PatientRecord::new()
            .with("edad", FeatureValue::Missing)
            .with("grado_histologi", 2.0);
        let row = pre.transform(&record).unwrap();
        assert_eq!(row.values().to_vec(), vec![55.0, 1.0]);
    }

    #[test]
    fn test_all_missing_imputes_every_median() {
        let final_features = features(&["edad", "imc", "tamano_tumoral", "grado"]);
        let medians = BTreeMap::from([
            ("edad".to_owned(), 62.0),
            ("imc".to_owned(), 29.5),
            ("tamano_tumoral".to_owned(), 3.2),
        ]);
        let train_columns = ["edad", "imc", "tamano_tumoral", "grado_2", "grado_3"];
        let schema = ColumnSchema::resolve(&final_features, &train_columns).unwrap();
        let pre = Preprocessor::new(&final_features, &medians, &schema);

        let row = pre.transform(&PatientRecord::new()).unwrap();
        let names: Vec<_> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(names, train_columns);
        for (feature, median) in &medians {
            assert_eq!(row.get(feature), Some(*median));
        }
        assert_eq!(row.get("grado_2"), Some(0.0));
        assert_eq!(row.get("grado_3"), Some(0.0));
    }

    #[test]
    fn test_extra_fields_and_reference_level_are_ignored() {
        let final_features = features(&["edad", "grado"]);
        let medians = BTreeMap::from([("edad".to_owned(), 50.0)]);
        let schema = ColumnSchema::resolve(&final_features, &["edad", "grado_2", "grado_3"]).unwrap();
        let pre = Preprocessor::new(&final_features, &medians, &schema);

        let record = PatientRecord::new()
            .with("edad", "70")
            .with("grado", 1.0)
            .with("unrelated", 9.0);
        let row = pre.transform(&record).unwrap();
        assert_eq!(row.values().to_vec(), vec![70.0, 0.0, 0.0]);
    }

    #[test]
    fn test_uncastable_numeric_is_schema_error() {
        let final_features = features(&["edad"]);
        let medians = BTreeMap::from([("edad".to_owned(), 50.0)]);
        let schema = ColumnSchema::resolve(&final_features, &["edad"]).unwrap();
        let pre = Preprocessor::new(&final_features, &medians, &schema);

        let err = pre
            .transform(&PatientRecord::new().with("edad", "old"))
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::NotNumeric { feature, value } if feature == "edad" && value == "old"
        ));
    }

    #[test]
    fn test_numeric_column_without_median_requires_value() {
        let final_features = features(&["asa"]);
        let medians = BTreeMap::new();
        let schema = ColumnSchema::resolve(&final_features, &["asa"]).unwrap();
        let pre = Preprocessor::new(&final_features, &medians, &schema);

        assert_eq!(
            pre.transform(&PatientRecord::new().with("asa", 2.0))
                .unwrap()
                .values()
                .to_vec(),
            vec![2.0]
        );
        assert!(matches!(
            pre.transform(&PatientRecord::new()),
            Err(SchemaError::MissingRequired { .. })
        ));
    }
}
