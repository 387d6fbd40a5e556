use std::path::PathBuf;

use anyhow::Context as _;
use nsmp_cox::{
    PredictError,
    artifacts::CoxArtifacts,
    fields::FieldCatalog,
    predictor::{self, CoxPrediction},
    record::PatientRecord,
};
use serde::{Deserialize, Serialize};

use super::OutputArg;
use crate::util::{Output, read_json_input};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ArtifactsArg {
    /// Directory written by `nsmp train`
    #[arg(long, default_value = "artifacts")]
    artifacts: PathBuf,
    /// Output file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

impl ArtifactsArg {
    fn load(&self) -> anyhow::Result<CoxArtifacts> {
        CoxArtifacts::load(&self.artifacts)
            .with_context(|| format!("Failed to load artifacts from {}", self.artifacts.display()))
    }
}

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct CoxPredictArg {
    #[clap(flatten)]
    artifacts: ArtifactsArg,
    /// Patient JSON: one record, or an array of records (stdin if omitted)
    #[arg(long)]
    input: Option<PathBuf>,
    /// Skip checking records against the declared input fields
    #[arg(long)]
    no_validate: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PatientInput {
    One(PatientRecord),
    Many(Vec<PatientRecord>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum BatchItem {
    Prediction(CoxPrediction),
    Error { error: String, client_error: bool },
}

pub(crate) fn run_predict(arg: &CoxPredictArg) -> anyhow::Result<()> {
    let artifacts = arg.artifacts.load()?;
    let catalog = (!arg.no_validate).then(FieldCatalog::nsmp);
    let output = arg.artifacts.output.as_deref();

    match read_json_input("patient", arg.input.as_deref())? {
        PatientInput::One(record) => {
            if let Some(catalog) = &catalog {
                catalog.validate(&record).context("Invalid patient record")?;
            }
            let prediction = predictor::predict(&record, &artifacts).map_err(describe)?;
            Output::save_json(&prediction, output)
        }
        PatientInput::Many(records) => {
            let checks: Vec<_> = records
                .iter()
                .map(|record| catalog.as_ref().map_or(Ok(()), |c| c.validate(record)))
                .collect();
            let predictions = predictor::predict_batch(&records, &artifacts);
            let items: Vec<_> = checks
                .into_iter()
                .zip(predictions)
                .map(|(check, prediction)| match check.map_err(PredictError::from).and(prediction) {
                    Ok(prediction) => BatchItem::Prediction(prediction),
                    Err(e) => BatchItem::Error {
                        client_error: e.is_client_error(),
                        error: e.to_string(),
                    },
                })
                .collect();
            let failed = items
                .iter()
                .filter(|item| matches!(item, BatchItem::Error { .. }))
                .count();
            tracing::info!(records = items.len(), failed, "scored batch");
            Output::save_json(&items, output)
        }
    }
}

fn describe(e: PredictError) -> anyhow::Error {
    let kind = if e.is_client_error() {
        "Invalid patient record"
    } else {
        "Prediction failed"
    };
    anyhow::Error::new(e).context(kind)
}

pub(crate) fn run_schema(arg: &OutputArg) -> anyhow::Result<()> {
    Output::save_json(&FieldCatalog::nsmp(), arg.output.as_deref())
}

pub(crate) fn run_model_info(arg: &ArtifactsArg) -> anyhow::Result<()> {
    let artifacts = arg.load()?;
    Output::save_json(&artifacts.model_info(), arg.output.as_deref())
}

#[cfg(test)]
mod tests {
    use nsmp_cox::record::FeatureValue;

    use super::*;

    #[test]
    fn test_input_accepts_object_or_array() {
        let one: PatientInput = serde_json::from_str(r#"{"edad": 61, "histotipo": null}"#).unwrap();
        let PatientInput::One(record) = one else {
            panic!("expected a single record");
        };
        assert_eq!(record.get("edad"), &FeatureValue::Number(61.0));
        assert_eq!(record.get("histotipo"), &FeatureValue::Missing);

        let many: PatientInput = serde_json::from_str(r#"[{"edad": 61}, {}]"#).unwrap();
        assert!(matches!(many, PatientInput::Many(records) if records.len() == 2));
    }

    #[test]
    fn test_batch_error_item_json() {
        let item = BatchItem::Error {
            error: "required field 'edad' is missing".to_owned(),
            client_error: true,
        };
        assert_eq!(
            serde_json::to_string(&item).unwrap(),
            r#"{"error":"required field 'edad' is missing","client_error":true}"#
        );
    }
}
