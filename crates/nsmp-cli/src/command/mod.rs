use std::path::PathBuf;

use clap::{Parser, Subcommand};

use self::{
    bayes::{BayesPredictArg, BayesQueryArg, NetworkArg},
    cox::{ArtifactsArg, CoxPredictArg},
    train::TrainArg,
    validate::ValidateArg,
};
use crate::logging;

mod bayes;
mod cox;
mod train;
mod validate;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log filter for workspace crates (e.g. `debug`); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Train the Cox model and write the artifact directory
    Train(#[clap(flatten)] TrainArg),
    /// Report held-out concordance and penalizer sensitivity
    Validate(#[clap(flatten)] ValidateArg),
    /// Predict recurrence risk with the Cox model
    CoxPredict(#[clap(flatten)] CoxPredictArg),
    /// Print the declared Cox input fields
    CoxSchema(#[clap(flatten)] OutputArg),
    /// Print the Cox model summary, feature importance and KM curves
    CoxModelInfo(#[clap(flatten)] ArtifactsArg),
    /// Predict recurrence with the Bayesian network
    BayesPredict(#[clap(flatten)] BayesPredictArg),
    /// Query posteriors of arbitrary network variables
    BayesQuery(#[clap(flatten)] BayesQueryArg),
    /// Print the network nodes and edges
    BayesGraph(#[clap(flatten)] NetworkArg),
    /// Print the declared Bayesian evidence fields and targets
    BayesSchema(#[clap(flatten)] OutputArg),
    /// Print the Bayesian network summary
    BayesModelInfo(#[clap(flatten)] NetworkArg),
}

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct OutputArg {
    /// Output file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    logging::init(args.log_level.as_deref());
    match args.mode {
        Mode::Train(arg) => train::run(&arg)?,
        Mode::Validate(arg) => validate::run(&arg)?,
        Mode::CoxPredict(arg) => cox::run_predict(&arg)?,
        Mode::CoxSchema(arg) => cox::run_schema(&arg)?,
        Mode::CoxModelInfo(arg) => cox::run_model_info(&arg)?,
        Mode::BayesPredict(arg) => bayes::run_predict(&arg)?,
        Mode::BayesQuery(arg) => bayes::run_query(&arg)?,
        Mode::BayesGraph(arg) => bayes::run_graph(&arg)?,
        Mode::BayesSchema(arg) => bayes::run_schema(&arg)?,
        Mode::BayesModelInfo(arg) => bayes::run_model_info(&arg)?,
    }
    Ok(())
}
