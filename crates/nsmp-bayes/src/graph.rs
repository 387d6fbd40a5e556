//! Network structure and summary as served to clients.

use serde::Serialize;

use crate::{network::Network, predictor::TARGET};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Nodes in declaration order and `parent → child` edges.
#[must_use]
pub fn graph(network: &Network) -> Graph {
    let nodes = network
        .names()
        .map(|name| GraphNode {
            id: name.to_owned(),
            label: node_label(name),
        })
        .collect();
    let edges = network
        .edges()
        .map(|(source, target)| GraphEdge {
            source: source.to_owned(),
            target: target.to_owned(),
        })
        .collect();
    Graph { nodes, edges }
}

/// Underscores become spaces and every word is title-cased.
///
/// A letter is upper-cased when it does not follow another letter, so
/// `FIGO2023` becomes `Figo2023` and `n_GC_Afect` becomes `N Gc Afect`.
#[must_use]
pub fn node_label(name: &str) -> String {
    let mut label = String::with_capacity(name.len());
    let mut after_letter = false;
    for ch in name.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if after_letter {
                label.extend(ch.to_lowercase());
            } else {
                label.extend(ch.to_uppercase());
            }
            after_letter = true;
        } else {
            label.push(ch);
            after_letter = false;
        }
    }
    label
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescription {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub engine: &'static str,
    pub target: &'static str,
    pub inference: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BayesModelInfo {
    pub model: ModelDescription,
    pub n_nodes: usize,
    pub n_edges: usize,
}

#[must_use]
pub fn model_info(network: &Network) -> BayesModelInfo {
    BayesModelInfo {
        model: ModelDescription {
            kind: "Bayesian Network",
            engine: env!("CARGO_PKG_NAME"),
            target: TARGET,
            inference: "Exact (Variable Elimination)",
        },
        n_nodes: network.len(),
        n_edges: network.edge_count(),
    }
}
