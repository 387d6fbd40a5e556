//! The frozen network artifact.
//!
//! On disk the network is one JSON object with a `variables` array. Each
//! variable lists its states, its parents and a conditional probability table
//! laid out as `cpd[state][column]`, where the column enumerates
//! parent configurations with the last parent varying fastest.
//!
//! ```json
//! {
//!   "variables": [
//!     { "name": "grado", "states": ["1.0", "2.0"], "cpd": [[0.7], [0.3]] },
//!     {
//!       "name": "recidiva",
//!       "states": ["0", "1"],
//!       "parents": ["grado"],
//!       "cpd": [[0.9, 0.6], [0.1, 0.4]]
//!     }
//!   ]
//! }
//! ```
//!
//! Structure is checked when loading: parents must be declared, tables must
//! have one row per state and one column per parent configuration, and every
//! column must be a probability distribution. Acyclicity is not checked.

use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::NetworkError;

/// Allowed deviation of a CPD column sum from 1.
pub const CPD_SUM_TOLERANCE: f64 = 1e-4;

/// One discrete variable and its conditional probability table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub states: Vec<String>,
    #[serde(default)]
    pub parents: Vec<String>,
    /// `cpd[state][parent_configuration]`, last parent varying fastest.
    pub cpd: Vec<Vec<f64>>,
}

impl Variable {
    #[must_use]
    pub fn cardinality(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn state_index(&self, state: &str) -> Option<usize> {
        self.states.iter().position(|s| s == state)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NetworkFile {
    variables: Vec<Variable>,
}

/// A validated, immutable Bayesian network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NetworkFile", into = "NetworkFile")]
pub struct Network {
    variables: Vec<Variable>,
    index: HashMap<String, usize>,
    parents: Vec<Vec<usize>>,
}

impl TryFrom<NetworkFile> for Network {
    type Error = NetworkError;

    fn try_from(file: NetworkFile) -> Result<Self, Self::Error> {
        Self::new(file.variables)
    }
}

impl From<Network> for NetworkFile {
    fn from(network: Network) -> Self {
        Self {
            variables: network.variables,
        }
    }
}

impl Network {
    /// Builds a network from declared variables, checking its structure.
    pub fn new(variables: Vec<Variable>) -> Result<Self, NetworkError> {
        let mut index = HashMap::with_capacity(variables.len());
        for (i, var) in variables.iter().enumerate() {
            if index.insert(var.name.clone(), i).is_some() {
                return Err(NetworkError::DuplicateVariable {
                    name: var.name.clone(),
                });
            }
        }

        let mut parents = Vec::with_capacity(variables.len());
        for var in &variables {
            check_states(var)?;
            let resolved = var
                .parents
                .iter()
                .map(|p| {
                    index.get(p).copied().ok_or_else(|| NetworkError::UnknownParent {
                        variable: var.name.clone(),
                        parent: p.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let columns = resolved
                .iter()
                .map(|&p| variables[p].cardinality())
                .product();
            check_cpd(var, columns)?;
            parents.push(resolved);
        }

        Ok(Self {
            variables,
            index,
            parents,
        })
    }

    /// Reads and validates a network JSON file.
    pub fn load<P>(path: P) -> Result<Self, NetworkError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| NetworkError::Io {
            path: path.to_owned(),
            source,
        })?;
        let file: NetworkFile =
            serde_json::from_str(&text).map_err(|source| NetworkError::Json {
                path: path.to_owned(),
                source,
            })?;
        let network = Self::new(file.variables)?;
        tracing::info!(
            path = %path.display(),
            nodes = network.len(),
            edges = network.edge_count(),
            "loaded bayesian network"
        );
        Ok(network)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.index_of(name).map(|i| &self.variables[i])
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.variables.iter().map(|v| v.name.as_str())
    }

    /// Parent indices of variable `i`, in declared order.
    #[must_use]
    pub fn parents_of(&self, i: usize) -> &[usize] {
        &self.parents[i]
    }

    /// `(parent, child)` pairs in variable declaration order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.variables
            .iter()
            .flat_map(|child| child.parents.iter().map(move |p| (p.as_str(), child.name.as_str())))
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.parents.iter().map(Vec::len).sum()
    }

    /// Marks `seeds` and all of their ancestors.
    #[must_use]
    pub fn ancestors(&self, seeds: impl IntoIterator<Item = usize>) -> Vec<bool> {
        let mut marked = vec![false; self.len()];
        let mut stack: Vec<usize> = seeds.into_iter().collect();
        while let Some(i) = stack.pop() {
            if marked[i] {
                continue;
            }
            marked[i] = true;
            stack.extend(self.parents[i].iter().copied().filter(|&p| !marked[p]));
        }
        marked
    }
}

fn check_states(var: &Variable) -> Result<(), NetworkError> {
    if var.states.is_empty() {
        return Err(NetworkError::NoStates {
            variable: var.name.clone(),
        });
    }
    for (i, state) in var.states.iter().enumerate() {
        if var.states[..i].contains(state) {
            return Err(NetworkError::DuplicateState {
                variable: var.name.clone(),
                state: state.clone(),
            });
        }
    }
    Ok(())
}

fn check_cpd(var: &Variable, columns: usize) -> Result<(), NetworkError> {
    let shape_error = |columns_found| NetworkError::TableShape {
        variable: var.name.clone(),
        expected_rows: var.cardinality(),
        expected_columns: columns,
        rows: var.cpd.len(),
        columns: columns_found,
    };
    if var.cpd.len() != var.cardinality() {
        return Err(shape_error(var.cpd.first().map_or(0, Vec::len)));
    }
    if let Some(row) = var.cpd.iter().find(|row| row.len() != columns) {
        return Err(shape_error(row.len()));
    }

    for (column, sum) in (0..columns).map(|c| (c, var.cpd.iter().map(|row| row[c]).sum::<f64>())) {
        if let Some(&value) = var
            .cpd
            .iter()
            .map(|row| &row[column])
            .find(|p| !(p.is_finite() && **p >= 0.0))
        {
            return Err(NetworkError::InvalidProbability {
                variable: var.name.clone(),
                value,
            });
        }
        if (sum - 1.0).abs() > CPD_SUM_TOLERANCE {
            return Err(NetworkError::ColumnSum {
                variable: var.name.clone(),
                column,
                sum,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_network;

    fn var(name: &str, states: &[&str], parents: &[&str], cpd: Vec<Vec<f64>>) -> Variable {
        Variable {
            name: name.to_owned(),
            states: states.iter().map(|&s| s.to_owned()).collect(),
            parents: parents.iter().map(|&s| s.to_owned()).collect(),
            cpd,
        }
    }

    #[test]
    fn test_sample_network_structure() {
        let network = sample_network();
        assert_eq!(network.len(), 4);
        assert_eq!(
            network.edges().collect::<Vec<_>>(),
            [
                ("edad", "grado_histologi"),
                ("grado_histologi", "recidiva"),
                ("edad", "recidiva"),
                ("recidiva", "estad"),
            ]
        );
        assert_eq!(network.edge_count(), 4);
        let recidiva = network.index_of("recidiva").unwrap();
        let marked = network.ancestors([recidiva]);
        assert_eq!(marked, [true, true, true, false]);
    }

    #[test]
    fn test_json_round_trip_keeps_declaration_order() {
        let network = sample_network();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.json");
        fs::write(&path, serde_json::to_string_pretty(&network).unwrap()).unwrap();

        let loaded = Network::load(&path).unwrap();
        assert_eq!(loaded, network);
        assert_eq!(
            loaded.names().collect::<Vec<_>>(),
            ["edad", "grado_histologi", "recidiva", "estad"]
        );
    }

    #[test]
    fn test_rejects_unknown_parent() {
        let err = Network::new(vec![var("a", &["x"], &["b"], vec![vec![1.0]])]).unwrap_err();
        assert!(matches!(err, NetworkError::UnknownParent { parent, .. } if parent == "b"));
    }

    #[test]
    fn test_rejects_bad_table_shape() {
        let err = Network::new(vec![
            var("a", &["x", "y"], &[], vec![vec![0.5], vec![0.5]]),
            var("b", &["x", "y"], &["a"], vec![vec![0.5], vec![0.5]]),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            NetworkError::TableShape {
                expected_rows: 2,
                expected_columns: 2,
                columns: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_column_not_summing_to_one() {
        let err =
            Network::new(vec![var("a", &["x", "y"], &[], vec![vec![0.5], vec![0.4]])]).unwrap_err();
        assert!(matches!(err, NetworkError::ColumnSum { column: 0, .. }));

        let err =
            Network::new(vec![var("a", &["x", "y"], &[], vec![vec![1.5], vec![-0.5]])]).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidProbability { .. }));
    }

    #[test]
    fn test_rejects_duplicates() {
        let err = Network::new(vec![
            var("a", &["x"], &[], vec![vec![1.0]]),
            var("a", &["x"], &[], vec![vec![1.0]]),
        ])
        .unwrap_err();
        assert!(matches!(err, NetworkError::DuplicateVariable { .. }));

        let err =
            Network::new(vec![var("a", &["x", "x"], &[], vec![vec![0.5], vec![0.5]])]).unwrap_err();
        assert!(matches!(err, NetworkError::DuplicateState { .. }));
    }

    #[test]
    fn test_load_reports_path() {
        let err = Network::load("/nonexistent/network.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/network.json"));
    }
}
