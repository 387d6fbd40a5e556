use std::path::PathBuf;

use anyhow::Context as _;
use nsmp_bayes::{
    QueryError,
    evidence::EvidenceRecord,
    fields::EvidenceCatalog,
    graph,
    network::Network,
    predictor::{self, FlexibleQuery},
};

use super::OutputArg;
use crate::util::{Output, read_json_input};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct NetworkArg {
    /// Network JSON file
    #[arg(long)]
    network: PathBuf,
    /// Output file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

impl NetworkArg {
    fn load(&self) -> anyhow::Result<Network> {
        Network::load(&self.network)
            .with_context(|| format!("Failed to load network from {}", self.network.display()))
    }
}

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct BayesPredictArg {
    #[clap(flatten)]
    network: NetworkArg,
    /// Evidence JSON object (stdin if omitted)
    #[arg(long)]
    input: Option<PathBuf>,
    /// Skip checking evidence against the declared fields
    #[arg(long)]
    no_validate: bool,
}

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct BayesQueryArg {
    #[clap(flatten)]
    network: NetworkArg,
    /// Query JSON: `{"targets": [...], "evidence": {...}}` (stdin if omitted)
    #[arg(long)]
    input: Option<PathBuf>,
}

pub(crate) fn run_predict(arg: &BayesPredictArg) -> anyhow::Result<()> {
    let network = arg.network.load()?;
    let record: EvidenceRecord = read_json_input("evidence", arg.input.as_deref())?;
    if !arg.no_validate {
        EvidenceCatalog::nsmp()
            .validate(&record)
            .context("Invalid evidence")?;
    }
    let prediction = predictor::predict(&record, &network).map_err(describe)?;
    Output::save_json(&prediction, arg.network.output.as_deref())
}

pub(crate) fn run_query(arg: &BayesQueryArg) -> anyhow::Result<()> {
    let network = arg.network.load()?;
    let query: FlexibleQuery = read_json_input("query", arg.input.as_deref())?;
    let prediction = predictor::predict_flexible(&query, &network).map_err(describe)?;
    Output::save_json(&prediction, arg.network.output.as_deref())
}

fn describe(e: QueryError) -> anyhow::Error {
    let kind = if e.is_client_error() {
        "Invalid query"
    } else {
        "Inference failed"
    };
    anyhow::Error::new(e).context(kind)
}

pub(crate) fn run_graph(arg: &NetworkArg) -> anyhow::Result<()> {
    let network = arg.load()?;
    Output::save_json(&graph::graph(&network), arg.output.as_deref())
}

pub(crate) fn run_schema(arg: &OutputArg) -> anyhow::Result<()> {
    Output::save_json(&EvidenceCatalog::nsmp(), arg.output.as_deref())
}

pub(crate) fn run_model_info(arg: &NetworkArg) -> anyhow::Result<()> {
    let network = arg.load()?;
    Output::save_json(&graph::model_info(&network), arg.output.as_deref())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser as _;

    use crate::command::{CommandArgs, Mode};

    #[test]
    fn test_parse_query_args() {
        let args = CommandArgs::try_parse_from([
            "nsmp",
            "bayes-query",
            "--network",
            "network.json",
            "--input",
            "query.json",
        ])
        .unwrap();
        let Mode::BayesQuery(arg) = args.mode else {
            panic!("expected bayes-query");
        };
        assert_eq!(arg.network.network.to_str(), Some("network.json"));
        assert_eq!(arg.input, Some(PathBuf::from("query.json")));
        assert_eq!(arg.network.output, None);
    }

    #[test]
    fn test_network_is_required() {
        assert!(CommandArgs::try_parse_from(["nsmp", "bayes-graph"]).is_err());
    }
}
