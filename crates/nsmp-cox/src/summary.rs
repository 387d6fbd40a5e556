//! Derived summary features.
//!
//! Nodal counts and genetic study results are sparse in the cohort; models
//! trained with summary features replace them with three binary flags.

use crate::{SchemaError, record::PatientRecord};

pub const NODAL_FEATURES: [&str; 4] = [
    "n_GC_Afect",
    "n_gangP_afec",
    "n_ganPaor_InfrM_afec",
    "n_ganPaor_Sup_afec",
];

pub const GENETIC_FEATURES: [&str; 6] = [
    "estudio_genetico_r01",
    "estudio_genetico_r02",
    "estudio_genetico_r03",
    "estudio_genetico_r04",
    "estudio_genetico_r05",
    "estudio_genetico_r06",
];

pub const NODAL_POSITIVE: &str = "nodal_positive";
pub const GENETIC_TEST_DONE: &str = "genetic_test_done";
pub const GENETIC_ABNORMAL: &str = "genetic_abnormal";

/// Every flag [`summarize`] adds.
pub const SUMMARY_FEATURES: [&str; 3] = [NODAL_POSITIVE, GENETIC_TEST_DONE, GENETIC_ABNORMAL];

#[must_use]
pub fn is_summary_feature(feature: &str) -> bool {
    SUMMARY_FEATURES.contains(&feature)
}

/// Returns a copy of `record` with the summary flags added.
///
/// - `nodal_positive`: any nodal count is positive (missing counts as 0)
/// - `genetic_test_done`: any genetic study result is present
/// - `genetic_abnormal`: any genetic study result equals 1
pub fn summarize(record: &PatientRecord) -> Result<PatientRecord, SchemaError> {
    let mut nodal_positive = false;
    for feature in NODAL_FEATURES {
        let count = record
            .get(feature)
            .to_number()
            .map_err(|text| SchemaError::NotNumeric {
                feature: feature.to_owned(),
                value: text.to_owned(),
            })?;
        nodal_positive |= count.unwrap_or(0.0) > 0.0;
    }

    let genetic = GENETIC_FEATURES.map(|f| record.get(f));
    let genetic_test_done = genetic.iter().any(|v| !v.is_missing());
    let genetic_abnormal = genetic
        .iter()
        .any(|v| v.to_number().ok().flatten() == Some(1.0));

    let flag = |b: bool| f64::from(u8::from(b));
    Ok(record
        .clone()
        .with(NODAL_POSITIVE, flag(nodal_positive))
        .with(GENETIC_TEST_DONE, flag(genetic_test_done))
        .with(GENETIC_ABNORMAL, flag(genetic_abnormal)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FeatureValue;

    #[test]
    fn test_empty_record() {
        let summary = summarize(&PatientRecord::new()).unwrap();
        assert_eq!(summary.get(NODAL_POSITIVE), &FeatureValue::Number(0.0));
        assert_eq!(summary.get(GENETIC_TEST_DONE), &FeatureValue::Number(0.0));
        assert_eq!(summary.get(GENETIC_ABNORMAL), &FeatureValue::Number(0.0));
    }

    #[test]
    fn test_flags() {
        let record = PatientRecord::new()
            .with("n_GC_Afect", FeatureValue::Missing)
            .with("n_gangP_afec", 2.0)
            .with("estudio_genetico_r03", 0.0)
            .with("edad", 64.0);
        let summary = summarize(&record).unwrap();
        assert_eq!(summary.get(NODAL_POSITIVE), &FeatureValue::Number(1.0));
        assert_eq!(summary.get(GENETIC_TEST_DONE), &FeatureValue::Number(1.0));
        assert_eq!(summary.get(GENETIC_ABNORMAL), &FeatureValue::Number(0.0));
        assert_eq!(summary.get("edad"), &FeatureValue::Number(64.0));

        let abnormal = summarize(&record.with("estudio_genetico_r05", "1")).unwrap();
        assert_eq!(abnormal.get(GENETIC_ABNORMAL), &FeatureValue::Number(1.0));
    }

    #[test]
    fn test_uncastable_nodal_count() {
        let record = PatientRecord::new().with("n_GC_Afect", "several");
        assert!(matches!(
            summarize(&record),
            Err(SchemaError::NotNumeric { feature, .. }) if feature == "n_GC_Afect"
        ));
    }
}
