//! The immutable Cox artifact bundle and its on-disk layout.
//!
//! An artifact directory contains:
//!
//! | file                      | content                                        |
//! |---------------------------|------------------------------------------------|
//! | `cox_model.json`          | [`CoxModel`]                                   |
//! | `preprocess.json`         | [`PreprocessMeta`]                             |
//! | `risk_thresholds.json`    | [`RiskThresholds`]                             |
//! | `feature_importance.json` | list of [`FeatureImportance`]                  |
//! | `km_curves.json`          | [`KmCurves`], keyed `Low` / `Medium` / `High`  |

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use nsmp_stats::survival::SurvivalPoint;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    ArtifactError,
    model::CoxModel,
    preprocess::Preprocessor,
    risk::{RiskGroup, RiskThresholds},
    schema::ColumnSchema,
};

pub const MODEL_FILE: &str = "cox_model.json";
pub const PREPROCESS_FILE: &str = "preprocess.json";
pub const THRESHOLDS_FILE: &str = "risk_thresholds.json";
pub const FEATURE_IMPORTANCE_FILE: &str = "feature_importance.json";
pub const KM_CURVES_FILE: &str = "km_curves.json";

/// Preprocessing metadata fixed at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessMeta {
    /// Raw features read from a patient record, in order.
    pub final_features: Vec<String>,
    /// Imputation values of numeric features, from the training split only.
    pub num_medians: BTreeMap<String, f64>,
    /// Design-matrix column names, in order.
    pub train_columns: Vec<String>,
    /// Explicit column schema. Older bundles only carry `train_columns`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_schema: Option<ColumnSchema>,
    pub seed: u64,
    pub penalizer: f64,
    /// Whether derived summary features are computed before preprocessing.
    #[serde(default)]
    pub summarized_features: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub internal_name: String,
    pub hazard_ratio: f64,
    pub coef: f64,
    /// `|coef|`
    pub importance: f64,
}

impl FeatureImportance {
    /// Importance table sorted by `|coef|` descending, ties in column order.
    #[must_use]
    pub fn from_model(model: &CoxModel) -> Vec<Self> {
        let mut table: Vec<_> = model
            .columns
            .iter()
            .zip(&model.coefficients)
            .map(|(name, &coef)| Self {
                internal_name: name.clone(),
                hazard_ratio: coef.exp(),
                coef,
                importance: coef.abs(),
            })
            .collect();
        table.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        table
    }
}

/// Kaplan-Meier step function of one risk group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskGroupCurve {
    pub n_patients: usize,
    pub curve: Vec<SurvivalPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KmCurves {
    #[serde(rename = "Low")]
    pub low: RiskGroupCurve,
    #[serde(rename = "Medium")]
    pub medium: RiskGroupCurve,
    #[serde(rename = "High")]
    pub high: RiskGroupCurve,
}

impl KmCurves {
    #[must_use]
    pub fn get(&self, group: RiskGroup) -> &RiskGroupCurve {
        match group {
            RiskGroup::Low => &self.low,
            RiskGroup::Medium => &self.medium,
            RiskGroup::High => &self.high,
        }
    }
}

/// Everything the Cox predictor needs, loaded once and shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct CoxArtifacts {
    pub model: CoxModel,
    pub preprocess: PreprocessMeta,
    pub schema: ColumnSchema,
    pub thresholds: RiskThresholds,
    pub feature_importance: Vec<FeatureImportance>,
    pub km_curves: KmCurves,
}

impl CoxArtifacts {
    /// Reads and validates an artifact directory.
    pub fn load<P>(dir: P) -> Result<Self, ArtifactError>
    where
        P: AsRef<Path>,
    {
        let dir = dir.as_ref();
        let model: CoxModel = read_json(&dir.join(MODEL_FILE))?;
        let preprocess: PreprocessMeta = read_json(&dir.join(PREPROCESS_FILE))?;
        let thresholds = read_json(&dir.join(THRESHOLDS_FILE))?;
        let feature_importance = read_json(&dir.join(FEATURE_IMPORTANCE_FILE))?;
        let km_curves = read_json(&dir.join(KM_CURVES_FILE))?;

        let schema = match &preprocess.column_schema {
            Some(schema) => schema.clone(),
            None => ColumnSchema::resolve(&preprocess.final_features, &preprocess.train_columns)
                .map_err(|e| ArtifactError::Invalid {
                    path: dir.join(PREPROCESS_FILE),
                    reason: e.to_string(),
                })?,
        };

        let artifacts = Self {
            model,
            preprocess,
            schema,
            thresholds,
            feature_importance,
            km_curves,
        };
        artifacts
            .validate()
            .map_err(|reason| ArtifactError::Invalid {
                path: dir.to_owned(),
                reason,
            })?;
        tracing::info!(
            dir = %dir.display(),
            columns = artifacts.schema.len(),
            "loaded cox artifacts"
        );
        Ok(artifacts)
    }

    /// Writes the bundle as pretty-printed JSON, creating `dir` if needed.
    pub fn save<P>(&self, dir: P) -> Result<(), ArtifactError>
    where
        P: AsRef<Path>,
    {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| ArtifactError::Io {
            path: dir.to_owned(),
            source,
        })?;

        let mut preprocess = self.preprocess.clone();
        preprocess.column_schema = Some(self.schema.clone());

        write_json(&dir.join(MODEL_FILE), &self.model)?;
        write_json(&dir.join(PREPROCESS_FILE), &preprocess)?;
        write_json(&dir.join(THRESHOLDS_FILE), &self.thresholds)?;
        write_json(&dir.join(FEATURE_IMPORTANCE_FILE), &self.feature_importance)?;
        write_json(&dir.join(KM_CURVES_FILE), &self.km_curves)?;
        tracing::info!(dir = %dir.display(), "saved cox artifacts");
        Ok(())
    }

    /// Cross-checks the parts of the bundle against each other.
    pub fn validate(&self) -> Result<(), String> {
        self.model.validate()?;
        let schema_names: Vec<_> = self.schema.names().collect();
        if schema_names != self.preprocess.train_columns {
            return Err("column schema does not match train_columns".to_owned());
        }
        if self.model.columns != self.preprocess.train_columns {
            return Err("model columns do not match train_columns".to_owned());
        }
        if let Some(feature) = self
            .preprocess
            .num_medians
            .keys()
            .find(|f| !self.preprocess.final_features.contains(f))
        {
            return Err(format!("median for unknown feature '{feature}'"));
        }
        let RiskThresholds { q1, q2 } = self.thresholds;
        if !(q1.is_finite() && q2.is_finite() && q1 <= q2) {
            return Err(format!("invalid risk thresholds q1={q1}, q2={q2}"));
        }
        for group in RiskGroup::ALL {
            let curve = &self.km_curves.get(group).curve;
            let monotone = curve.windows(2).all(|w| {
                w[0].time_days <= w[1].time_days && w[0].survival >= w[1].survival
            });
            let bounded = curve.iter().all(|p| (0.0..=1.0).contains(&p.survival));
            if !(monotone && bounded) {
                return Err(format!("{group} survival curve is not non-increasing in [0, 1]"));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn preprocessor(&self) -> Preprocessor<'_> {
        Preprocessor::new(
            &self.preprocess.final_features,
            &self.preprocess.num_medians,
            &self.schema,
        )
    }

    #[must_use]
    pub fn model_info(&self) -> CoxModelInfo<'_> {
        let summary = &self.model.summary;
        CoxModelInfo {
            model: ModelDescription {
                kind: "Cox proportional hazards",
                population: "NSMP endometrial cancer",
                n_patients: summary.n_observations,
                n_events: summary.n_events,
                test_c_index: summary.held_out_concordance,
                penalizer: summary.penalizer,
                trained_at: self.preprocess.trained_at,
            },
            features: &self.feature_importance,
            risk_groups: &self.km_curves,
        }
    }
}

/// Model summary exposed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct CoxModelInfo<'a> {
    pub model: ModelDescription,
    pub features: &'a [FeatureImportance],
    pub risk_groups: &'a KmCurves,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelDescription {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub population: &'static str,
    pub n_patients: usize,
    pub n_events: usize,
    pub test_c_index: Option<f64>,
    pub penalizer: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<DateTime<Utc>>,
}

fn read_json<T>(path: &Path) -> Result<T, ArtifactError>
where
    T: DeserializeOwned,
{
    let file = File::open(path).map_err(|source| ArtifactError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ArtifactError::Json {
        path: path.to_owned(),
        source,
    })
}

fn write_json<T>(path: &Path, value: &T) -> Result<(), ArtifactError>
where
    T: Serialize + ?Sized,
{
    let io_error = |source| ArtifactError::Io {
        path: PathBuf::from(path),
        source,
    };
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| ArtifactError::Json {
        path: path.to_owned(),
        source,
    })?;
    writeln!(writer).map_err(io_error)?;
    writer.flush().map_err(io_error)
}
