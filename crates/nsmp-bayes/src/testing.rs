use crate::network::{Network, Variable};

fn var(name: &str, states: &[&str], parents: &[&str], cpd: Vec<Vec<f64>>) -> Variable {
    Variable {
        name: name.to_owned(),
        states: states.iter().map(|&s| s.to_owned()).collect(),
        parents: parents.iter().map(|&s| s.to_owned()).collect(),
        cpd,
    }
}

/// `edad → grado_histologi → recidiva ← edad`, `recidiva → estad`.
pub(crate) fn sample_network() -> Network {
    Network::new(vec![
        var("edad", &["0.0", "1.0", "Missing"], &[], vec![
            vec![0.5],
            vec![0.3],
            vec![0.2],
        ]),
        var(
            "grado_histologi",
            &["1.0", "2.0", "Missing"],
            &["edad"],
            vec![
                vec![0.6, 0.4, 0.5],
                vec![0.3, 0.5, 0.3],
                vec![0.1, 0.1, 0.2],
            ],
        ),
        var(
            "recidiva",
            &["0", "1"],
            &["grado_histologi", "edad"],
            vec![
                vec![0.9, 0.85, 0.8, 0.7, 0.6, 0.65, 0.8, 0.75, 0.7],
                vec![0.1, 0.15, 0.2, 0.3, 0.4, 0.35, 0.2, 0.25, 0.3],
            ],
        ),
        var("estad", &["vivo", "muerto"], &["recidiva"], vec![
            vec![0.95, 0.6],
            vec![0.05, 0.4],
        ]),
    ])
    .unwrap()
}

/// Joint probability of a full assignment, by state index in declaration
/// order.
pub(crate) fn joint(network: &Network, assignment: &[usize]) -> f64 {
    network
        .variables()
        .iter()
        .enumerate()
        .map(|(i, var)| {
            let column = network
                .parents_of(i)
                .iter()
                .fold(0, |col, &p| col * network.variables()[p].cardinality() + assignment[p]);
            var.cpd[assignment[i]][column]
        })
        .product()
}

/// Posterior of `target` given `evidence` by enumerating the full joint.
pub(crate) fn brute_force(network: &Network, target: &str, evidence: &[(&str, &str)]) -> Vec<f64> {
    let cards: Vec<usize> = network.variables().iter().map(Variable::cardinality).collect();
    let fixed: Vec<Option<usize>> = network
        .variables()
        .iter()
        .map(|var| {
            evidence
                .iter()
                .find(|(name, _)| *name == var.name)
                .map(|(_, state)| var.state_index(state).unwrap())
        })
        .collect();
    let t = network.index_of(target).unwrap();

    let mut posterior = vec![0.0; cards[t]];
    let total: usize = cards.iter().product();
    for mut flat in 0..total {
        let mut assignment = vec![0; cards.len()];
        for i in (0..cards.len()).rev() {
            assignment[i] = flat % cards[i];
            flat /= cards[i];
        }
        if fixed
            .iter()
            .zip(&assignment)
            .any(|(f, a)| f.is_some_and(|f| f != *a))
        {
            continue;
        }
        posterior[assignment[t]] += joint(network, &assignment);
    }
    let norm: f64 = posterior.iter().sum();
    posterior.iter().map(|p| p / norm).collect()
}
