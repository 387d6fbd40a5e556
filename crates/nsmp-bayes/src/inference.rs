//! Exact posterior marginals by variable elimination.

use crate::{
    InferenceError, QueryError, SchemaError, UnknownTargetError,
    evidence::Evidence,
    factor::Factor,
    network::Network,
    ordered::Distribution,
};

/// Variable elimination over a borrowed network.
///
/// Each query:
///
/// 1. drops evidence on variables that are not nodes and resolves the rest
///    to state indices,
/// 2. keeps only the target, the evidence variables and their ancestors
///    (every other node is barren and sums to one),
/// 3. reduces the kept CPDs by the evidence,
/// 4. eliminates the hidden variables in greedy min-fill order,
/// 5. normalizes what is left over the target's states.
#[derive(Debug, Clone, Copy)]
pub struct VariableElimination<'a> {
    network: &'a Network,
}

impl<'a> VariableElimination<'a> {
    #[must_use]
    pub fn new(network: &'a Network) -> Self {
        Self { network }
    }

    #[must_use]
    pub fn network(&self) -> &'a Network {
        self.network
    }

    /// Resolves evidence to `(variable, state)` indices, skipping variables
    /// that are not nodes.
    pub fn resolve(&self, evidence: &Evidence) -> Result<Vec<(usize, usize)>, SchemaError> {
        let mut resolved = Vec::with_capacity(evidence.len());
        for (name, state) in evidence.iter() {
            let Some(var) = self.network.index_of(name) else {
                tracing::trace!(variable = name, "ignoring evidence on unknown variable");
                continue;
            };
            let variable = &self.network.variables()[var];
            let state_index =
                variable
                    .state_index(state)
                    .ok_or_else(|| SchemaError::UnknownState {
                        variable: name.to_owned(),
                        state: state.to_owned(),
                        allowed: variable.states.clone(),
                    })?;
            resolved.push((var, state_index));
        }
        Ok(resolved)
    }

    /// Posterior distribution of `target` given `evidence`.
    ///
    /// Observing the target itself is a client error.
    pub fn query(&self, target: &str, evidence: &Evidence) -> Result<Distribution, QueryError> {
        let network = self.network;
        let t = network
            .index_of(target)
            .ok_or_else(|| UnknownTargetError {
                target: target.to_owned(),
            })?;
        let observed = self.resolve(evidence)?;
        if observed.iter().any(|&(v, _)| v == t) {
            return Err(InferenceError::TargetInEvidence {
                variable: target.to_owned(),
            }
            .into());
        }

        let relevant = network.ancestors(std::iter::once(t).chain(observed.iter().map(|&(v, _)| v)));
        let mut factors: Vec<Factor> = (0..network.len())
            .filter(|&i| relevant[i])
            .map(|i| {
                observed
                    .iter()
                    .fold(Factor::from_cpd(network, i), |f, &(v, s)| f.reduce(v, s))
            })
            .collect();
        let mut hidden: Vec<usize> = (0..network.len())
            .filter(|&i| relevant[i] && i != t && observed.iter().all(|&(v, _)| v != i))
            .collect();
        tracing::debug!(
            variable = target,
            evidence = observed.len(),
            kept = factors.len(),
            hidden = hidden.len(),
            "variable elimination"
        );

        while let Some(var) = min_fill_variable(&factors, &hidden) {
            hidden.retain(|&v| v != var);
            let (touching, rest): (Vec<_>, Vec<_>) =
                factors.into_iter().partition(|f| f.contains(var));
            factors = rest;
            if let Some(product) = touching.into_iter().reduce(|a, b| a.product(&b)) {
                factors.push(product.sum_out(var));
            }
        }

        let joint = factors
            .iter()
            .fold(Factor::new(vec![], vec![], vec![1.0]), |acc, f| acc.product(f));
        let normalizer = joint.total();
        if !normalizer.is_finite() {
            return Err(InferenceError::NonFinite {
                target: target.to_owned(),
                normalizer,
            }
            .into());
        }
        if normalizer <= 0.0 {
            return Err(InferenceError::ImpossibleEvidence {
                target: target.to_owned(),
            }
            .into());
        }

        let states = &network.variables()[t].states;
        Ok(states
            .iter()
            .zip(joint.values())
            .map(|(state, p)| (state.clone(), p / normalizer))
            .collect())
    }
}

/// The hidden variable whose elimination adds the fewest fill-in edges.
///
/// Ties go to the variable with fewer neighbors, then the lower index.
fn min_fill_variable(factors: &[Factor], hidden: &[usize]) -> Option<usize> {
    let adjacent = |a: usize, b: usize| factors.iter().any(|f| f.contains(a) && f.contains(b));
    hidden.iter().copied().min_by_key(|&var| {
        let mut neighbors: Vec<usize> = factors
            .iter()
            .filter(|f| f.contains(var))
            .flat_map(|f| f.scope().iter().copied())
            .filter(|&v| v != var)
            .collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        let fill = neighbors
            .iter()
            .enumerate()
            .flat_map(|(i, &a)| neighbors[i + 1..].iter().map(move |&b| (a, b)))
            .filter(|&(a, b)| !adjacent(a, b))
            .count();
        (fill, neighbors.len(), var)
    })
}
