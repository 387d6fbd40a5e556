use std::path::{Path, PathBuf};

use anyhow::Context as _;
use nsmp_cox::{artifacts::CoxArtifacts, fields::FieldCatalog};
use nsmp_training::{
    cohort::Cohort,
    config::{DEFAULT_FEATURES, TrainingConfig},
    trainer,
};

use crate::util::{Output, read_json_file, split_list};

/// Cohort, feature and configuration options shared by training commands.
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainingArgs {
    /// Cohort JSON file: an array of records with `time_days` and `event`
    #[arg(long)]
    cohort: PathBuf,
    /// Model features, comma separated (defaults to the standard NSMP set)
    #[arg(long, value_delimiter = ',')]
    features: Vec<String>,
    /// Training configuration JSON file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    penalizer: Option<f64>,
    #[arg(long)]
    test_fraction: Option<f64>,
    /// Features to one-hot encode even when numeric, comma separated
    #[arg(long, value_delimiter = ',')]
    categorical: Vec<String>,
    /// Derive nodal and genetic summary flags before encoding
    #[arg(long)]
    summarize_features: bool,
}

impl TrainingArgs {
    pub(crate) fn load(&self) -> anyhow::Result<(Cohort, Vec<String>, TrainingConfig)> {
        let cohort: Cohort = read_json_file("cohort", &self.cohort)?;
        cohort
            .validate()
            .with_context(|| format!("Invalid cohort: {}", self.cohort.display()))?;

        let features = match split_list(&self.features) {
            features if features.is_empty() => {
                DEFAULT_FEATURES.iter().map(|&f| f.to_owned()).collect()
            }
            features => features,
        };

        let mut config = match &self.config {
            Some(path) => read_json_file("training config", path)?,
            None => TrainingConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(penalizer) = self.penalizer {
            config.penalizer = penalizer;
        }
        if let Some(test_fraction) = self.test_fraction {
            config.test_fraction = test_fraction;
        }
        config.categorical.extend(split_list(&self.categorical));
        config.summarize_features |= self.summarize_features;
        let config = config.for_features(&features);

        tracing::info!(
            rows = cohort.len(),
            events = cohort.event_count(),
            features = features.len(),
            seed = config.seed,
            penalizer = config.penalizer,
            "loaded cohort"
        );
        Ok((cohort, features, config))
    }
}

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    #[clap(flatten)]
    training: TrainingArgs,
    /// Directory the artifacts are written to
    #[arg(long, default_value = "artifacts")]
    output_dir: PathBuf,
    /// Where to write the model summary (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let TrainArg {
        training,
        output_dir,
        output,
    } = arg;
    let (cohort, features, config) = training.load()?;

    let uncovered = FieldCatalog::nsmp().uncovered(&features);
    if !uncovered.is_empty() {
        tracing::warn!(?uncovered, "model features without a declared input field");
    }

    let artifacts = trainer::fit(&cohort, &features, &config).context("Training failed")?;
    save_artifacts(&artifacts, output_dir)?;
    Output::save_json(&artifacts.model_info(), output.as_deref())
}

fn save_artifacts(artifacts: &CoxArtifacts, dir: &Path) -> anyhow::Result<()> {
    artifacts
        .save(dir)
        .with_context(|| format!("Failed to save artifacts to {}", dir.display()))?;
    tracing::info!(dir = %dir.display(), "saved artifacts");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;

    use crate::command::CommandArgs;

    #[test]
    fn test_parse_feature_lists() {
        let args = CommandArgs::try_parse_from([
            "nsmp",
            "train",
            "--cohort",
            "cohort.json",
            "--features",
            "edad,imc",
            "--categorical",
            "grado_histologi",
            "--penalizer",
            "0.5",
        ])
        .unwrap();
        let crate::command::Mode::Train(arg) = args.mode else {
            panic!("expected train");
        };
        assert_eq!(arg.training.features, ["edad", "imc"]);
        assert_eq!(arg.training.categorical, ["grado_histologi"]);
        assert_eq!(arg.training.penalizer, Some(0.5));
        assert_eq!(arg.output_dir.to_str(), Some("artifacts"));
    }
}
