//! The Cox training pipeline.

use chrono::Utc;
use nsmp_cox::{
    artifacts::{CoxArtifacts, FeatureImportance, KmCurves, PreprocessMeta, RiskGroupCurve},
    fit,
    model::CoxModel,
    risk::{RiskGroup, RiskThresholds},
};
use nsmp_stats::{concordance::concordance_index, quantile::compute_quantile, survival::KaplanMeierCurve};

use crate::{
    TrainingError,
    cohort::Cohort,
    config::TrainingConfig,
    encoding::{Dataset, Encoding},
    split::{Split, train_test_split},
};

/// A cohort split and encoded for fitting.
///
/// Shared by [`fit`] and the diagnostics so both see identical inputs.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub split: Split,
    pub encoding: Encoding,
    pub train: Dataset,
    pub test: Dataset,
}

/// Splits the cohort, learns the encoding on the training split and encodes
/// both partitions.
pub fn prepare(
    cohort: &Cohort,
    features: &[String],
    config: &TrainingConfig,
) -> Result<Prepared, TrainingError> {
    cohort.validate()?;
    if !(0.0..1.0).contains(&config.test_fraction) {
        return Err(TrainingError::InvalidTestFraction {
            fraction: config.test_fraction,
        });
    }

    let summarized;
    let cohort = if config.summarize_features {
        summarized = cohort.summarized()?;
        &summarized
    } else {
        cohort
    };

    let split = train_test_split(cohort.len(), config.test_fraction, config.seed);
    if split.train.len() < 2 {
        return Err(TrainingError::TooFewRows {
            rows: split.train.len(),
        });
    }
    let rows = cohort.rows();
    let train_rows: Vec<_> = split.train.iter().map(|&i| &rows[i]).collect();
    let test_rows: Vec<_> = split.test.iter().map(|&i| &rows[i]).collect();

    let encoding = Encoding::learn(&train_rows, features, config)?;
    let train = encoding.dataset(&train_rows)?;
    let test = encoding.dataset(&test_rows)?;
    tracing::info!(
        n_train = train.len(),
        n_test = test.len(),
        columns = encoding.schema.len(),
        "prepared training data"
    );

    Ok(Prepared {
        split,
        encoding,
        train,
        test,
    })
}

/// Fits the Cox model on the training split.
pub fn fit_model(prepared: &Prepared, config: &TrainingConfig) -> Result<CoxModel, TrainingError> {
    let model = fit::fit(
        prepared.encoding.column_names(),
        prepared.train.x.view(),
        &prepared.train.times,
        &prepared.train.events,
        &config.fit_options(),
    )?;
    Ok(model)
}

/// Partial hazard of every row of `data`.
pub fn partial_hazards(model: &CoxModel, data: &Dataset) -> Result<Vec<f64>, TrainingError> {
    data.x
        .rows()
        .into_iter()
        .map(|row| model.partial_hazard(row).map_err(TrainingError::from))
        .collect()
}

/// Harrell's C of `model` on `data`, ranking by negated partial hazard.
///
/// `None` when `data` has no comparable pair.
pub fn concordance(model: &CoxModel, data: &Dataset) -> Result<Option<f64>, TrainingError> {
    let predicted: Vec<f64> = partial_hazards(model, data)?.into_iter().map(|h| -h).collect();
    Ok(concordance_index(&data.times, &predicted, &data.events))
}

/// Runs the full training pipeline and returns the artifact bundle.
pub fn fit(
    cohort: &Cohort,
    features: &[String],
    config: &TrainingConfig,
) -> Result<CoxArtifacts, TrainingError> {
    let prepared = prepare(cohort, features, config)?;
    let mut model = fit_model(&prepared, config)?;
    tracing::info!(
        iterations = model.summary.iterations,
        log_likelihood = model.summary.log_likelihood,
        "fitted cox model"
    );

    let train_scores = partial_hazards(&model, &prepared.train)?;
    let thresholds = tertile_thresholds(&train_scores);
    tracing::info!(q1 = thresholds.q1, q2 = thresholds.q2, "risk thresholds");

    model.summary.held_out_concordance = concordance(&model, &prepared.test)?;
    if let Some(c_index) = model.summary.held_out_concordance {
        tracing::info!(c_index, "held-out concordance");
    }

    let km_curves = risk_group_curves(&prepared.train, &train_scores, &thresholds);
    let feature_importance = FeatureImportance::from_model(&model);

    let Encoding {
        final_features,
        medians,
        schema,
    } = prepared.encoding;
    let artifacts = CoxArtifacts {
        preprocess: PreprocessMeta {
            final_features,
            num_medians: medians,
            train_columns: model.columns.clone(),
            column_schema: Some(schema.clone()),
            seed: config.seed,
            penalizer: config.penalizer,
            summarized_features: config.summarize_features,
            trained_at: Some(Utc::now()),
        },
        model,
        schema,
        thresholds,
        feature_importance,
        km_curves,
    };
    artifacts
        .validate()
        .map_err(|reason| TrainingError::InvalidArtifacts { reason })?;
    Ok(artifacts)
}

/// The 1/3 and 2/3 quantiles of the training partial hazards.
#[must_use]
pub fn tertile_thresholds(scores: &[f64]) -> RiskThresholds {
    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);
    RiskThresholds {
        q1: compute_quantile(&sorted, 1.0 / 3.0),
        q2: compute_quantile(&sorted, 2.0 / 3.0),
    }
}

/// Kaplan-Meier curve of each risk group over the training split.
fn risk_group_curves(train: &Dataset, scores: &[f64], thresholds: &RiskThresholds) -> KmCurves {
    let curve_for = |group: RiskGroup| {
        let data: Vec<(f64, bool)> = train
            .times
            .iter()
            .zip(&train.events)
            .zip(scores)
            .filter(|(_, score)| thresholds.classify(**score) == group)
            .map(|((&time, &event), _)| (time, !event))
            .collect();
        if data.is_empty() {
            tracing::warn!(%group, "risk group has no training patients");
        }
        let curve = KaplanMeierCurve::from_data(data);
        RiskGroupCurve {
            n_patients: curve.subject_count(),
            curve: curve.step_points(),
        }
    };
    KmCurves {
        low: curve_for(RiskGroup::Low),
        medium: curve_for(RiskGroup::Medium),
        high: curve_for(RiskGroup::High),
    }
}

#[cfg(test)]
mod tests {
    use nsmp_cox::{predictor, record::PatientRecord};

    use super::*;
    use crate::testing::{sample_cohort, sample_features};

    #[test]
    fn test_fit_produces_consistent_artifacts() {
        let cohort = sample_cohort(80);
        let config = TrainingConfig {
            categorical: vec!["grado_histologi".to_owned()],
            ..TrainingConfig::default()
        };
        let artifacts = fit(&cohort, &sample_features(), &config).unwrap();

        assert_eq!(
            artifacts.preprocess.train_columns,
            ["edad", "imc", "grado_histologi_2", "grado_histologi_3", "histotipo_serous"]
        );
        assert_eq!(artifacts.preprocess.seed, 42);
        assert!(artifacts.thresholds.q1 <= artifacts.thresholds.q2);
        assert_eq!(artifacts.model.summary.n_observations, 64);

        let total: usize = RiskGroup::ALL
            .iter()
            .map(|&g| artifacts.km_curves.get(g).n_patients)
            .sum();
        assert_eq!(total, 64);
        for group in RiskGroup::ALL {
            let curve = &artifacts.km_curves.get(group).curve;
            assert_eq!(curve[0].time_days, 0.0);
            assert_eq!(curve[0].survival, 1.0);
        }

        let importance: Vec<_> = artifacts
            .feature_importance
            .iter()
            .map(|f| f.importance)
            .collect();
        assert!(importance.is_sorted_by(|a, b| a >= b));
    }

    #[test]
    fn test_medians_come_from_train_split_only() {
        let cohort = sample_cohort(40);
        let config = TrainingConfig::default();
        let prepared = prepare(&cohort, &sample_features(), &config).unwrap();

        let mut train_ages: Vec<f64> = prepared
            .split
            .train
            .iter()
            .filter_map(|&i| cohort.rows()[i].features.get("edad").to_number().ok().flatten())
            .collect();
        train_ages.sort_by(f64::total_cmp);
        let expected = nsmp_stats::descriptive::median_of_sorted(&train_ages);
        assert_eq!(prepared.encoding.medians["edad"], expected);
        assert_eq!(prepared.test.len(), 8);
    }

    #[test]
    fn test_training_is_deterministic() {
        let cohort = sample_cohort(60);
        let config = TrainingConfig::default();
        let a = fit(&cohort, &sample_features(), &config).unwrap();
        let b = fit(&cohort, &sample_features(), &config).unwrap();
        assert_eq!(a.preprocess.num_medians, b.preprocess.num_medians);
        assert_eq!(a.preprocess.train_columns, b.preprocess.train_columns);
        assert_eq!(a.thresholds, b.thresholds);
        assert_eq!(a.model.coefficients, b.model.coefficients);
    }

    #[test]
    fn test_trained_artifacts_serve_predictions() {
        let cohort = sample_cohort(60);
        let artifacts = fit(&cohort, &sample_features(), &TrainingConfig::default()).unwrap();
        let prediction = predictor::predict(&PatientRecord::new(), &artifacts).unwrap();
        assert!(prediction.dfs_prob_1y >= prediction.dfs_prob_5y);
        assert!(prediction.top_contributors.0.len() <= 5);
    }

    #[test]
    fn test_tertile_thresholds() {
        let thresholds = tertile_thresholds(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(thresholds, RiskThresholds { q1: 2.0, q2: 3.0 });
        assert_eq!(thresholds.classify(2.0), RiskGroup::Low);
        assert_eq!(thresholds.classify(2.5), RiskGroup::Medium);
        assert_eq!(thresholds.classify(3.5), RiskGroup::High);
    }

    #[test]
    fn test_too_small_cohort() {
        let cohort = sample_cohort(2);
        let err = fit(&cohort, &sample_features(), &TrainingConfig::default()).unwrap_err();
        assert!(matches!(err, TrainingError::TooFewRows { rows: 1 }));
    }
}
