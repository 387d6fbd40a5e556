use std::path::PathBuf;

use anyhow::Context as _;
use nsmp_training::diagnostics;

use super::train::TrainingArgs;
use crate::util::Output;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ValidateArg {
    #[clap(flatten)]
    training: TrainingArgs,
    /// Output file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &ValidateArg) -> anyhow::Result<()> {
    let ValidateArg { training, output } = arg;
    let (cohort, features, config) = training.load()?;
    let report =
        diagnostics::validate(&cohort, &features, &config).context("Validation failed")?;
    match report.concordance {
        Some(c_index) => tracing::info!(c_index, "held-out concordance"),
        None => tracing::warn!("test split has no comparable pairs"),
    }
    Output::save_json(&report, output.as_deref())
}
