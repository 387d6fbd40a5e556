//! Shared fixtures for unit tests.

use std::collections::BTreeMap;

use nsmp_stats::survival::SurvivalPoint;

use crate::{
    artifacts::{CoxArtifacts, FeatureImportance, KmCurves, PreprocessMeta, RiskGroupCurve},
    model::{CoxModel, FitSummary, HazardPoint},
    risk::RiskThresholds,
    schema::ColumnSchema,
};

fn curve(points: &[(f64, f64)]) -> Vec<SurvivalPoint> {
    points
        .iter()
        .map(|&(time_days, survival)| SurvivalPoint {
            time_days,
            survival,
        })
        .collect()
}

/// A small hand-built bundle with two numeric and one categorical feature.
pub(crate) fn sample_artifacts() -> CoxArtifacts {
    let final_features: Vec<String> = ["edad", "imc", "grado_histologi"]
        .map(String::from)
        .to_vec();
    let train_columns: Vec<String> = ["edad", "imc", "grado_histologi_2", "grado_histologi_3"]
        .map(String::from)
        .to_vec();
    let schema = ColumnSchema::resolve(&final_features, &train_columns).unwrap();

    let model = CoxModel {
        columns: train_columns.clone(),
        coefficients: vec![0.03, -0.01, 0.4, 0.9],
        means: vec![60.0, 28.0, 0.3, 0.2],
        baseline_cumulative_hazard: vec![
            HazardPoint { time_days: 120.0, cumulative_hazard: 0.01 },
            HazardPoint { time_days: 300.0, cumulative_hazard: 0.03 },
            HazardPoint { time_days: 700.0, cumulative_hazard: 0.07 },
            HazardPoint { time_days: 1400.0, cumulative_hazard: 0.12 },
            HazardPoint { time_days: 2100.0, cumulative_hazard: 0.18 },
        ],
        summary: FitSummary {
            penalizer: 0.1,
            log_likelihood: -80.5,
            iterations: 6,
            n_observations: 90,
            n_events: 17,
            held_out_concordance: Some(0.78),
        },
    };
    let feature_importance = FeatureImportance::from_model(&model);

    CoxArtifacts {
        preprocess: PreprocessMeta {
            final_features,
            num_medians: BTreeMap::from([("edad".to_owned(), 60.0), ("imc".to_owned(), 28.0)]),
            train_columns,
            column_schema: None,
            seed: 42,
            penalizer: 0.1,
            summarized_features: false,
            trained_at: None,
        },
        model,
        schema,
        thresholds: RiskThresholds { q1: 0.8, q2: 1.3 },
        feature_importance,
        km_curves: KmCurves {
            low: RiskGroupCurve {
                n_patients: 30,
                curve: curve(&[(0.0, 1.0), (400.0, 0.97), (1500.0, 0.93)]),
            },
            medium: RiskGroupCurve {
                n_patients: 30,
                curve: curve(&[(0.0, 1.0), (300.0, 0.9), (900.0, 0.85)]),
            },
            high: RiskGroupCurve {
                n_patients: 30,
                curve: curve(&[(0.0, 1.0), (150.0, 0.8), (600.0, 0.6)]),
            },
        },
    }
}
