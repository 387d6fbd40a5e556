//! Recurrence prediction and free-form posterior queries.

use serde::{Deserialize, Serialize};

use crate::{
    QueryError, UnknownTargetError,
    evidence::{self, EvidenceRecord},
    fields::EvidenceCatalog,
    inference::VariableElimination,
    network::Network,
    ordered::{Distribution, OrderedMap},
};

/// The variable [`predict`] reports on.
pub const TARGET: &str = "recidiva";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayesPrediction {
    pub target: String,
    pub probabilities: Distribution,
    /// First state in declared order among those with the highest probability.
    pub most_likely: String,
}

/// A request for the posteriors of several variables under shared evidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlexibleQuery {
    pub targets: Vec<String>,
    #[serde(default)]
    pub evidence: Option<EvidenceRecord>,
}

/// Independent marginal posterior of each requested target, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlexiblePrediction {
    pub results: OrderedMap<Distribution>,
}

/// Posterior of [`TARGET`] for one patient.
///
/// Declared evidence fields absent from `record` count as `Missing`.
pub fn predict(record: &EvidenceRecord, network: &Network) -> Result<BayesPrediction, QueryError> {
    let catalog = EvidenceCatalog::nsmp();
    let record = record.clone().with_defaults(catalog.field_names());
    let evidence = evidence::preprocess(&record, network);
    let probabilities = VariableElimination::new(network).query(TARGET, &evidence)?;
    let most_likely = most_likely(&probabilities).unwrap_or_default();
    tracing::debug!(%most_likely, evidence = evidence.len(), "bayesian prediction");
    Ok(BayesPrediction {
        target: TARGET.to_owned(),
        probabilities,
        most_likely,
    })
}

/// Posteriors of every target in `query`, each computed on its own.
///
/// Every target is checked before any inference runs, so an unknown target
/// fails the whole request. A repeated target is answered once, at its first
/// position.
pub fn predict_flexible(
    query: &FlexibleQuery,
    network: &Network,
) -> Result<FlexiblePrediction, QueryError> {
    if let Some(unknown) = query.targets.iter().find(|t| !network.contains(t)) {
        return Err(UnknownTargetError {
            target: unknown.clone(),
        }
        .into());
    }
    let record = query.evidence.clone().unwrap_or_default();
    let evidence = evidence::preprocess(&record, network);
    let engine = VariableElimination::new(network);
    let mut targets: Vec<&String> = Vec::with_capacity(query.targets.len());
    for target in &query.targets {
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    let results = targets
        .into_iter()
        .map(|target| Ok((target.clone(), engine.query(target, &evidence)?)))
        .collect::<Result<_, QueryError>>()?;
    Ok(FlexiblePrediction { results })
}

/// First state with the maximal probability.
#[must_use]
pub fn most_likely(distribution: &Distribution) -> Option<String> {
    let mut best: Option<(&str, f64)> = None;
    for (state, &p) in distribution.iter() {
        if best.is_none_or(|(_, max)| p > max) {
            best = Some((state, p));
        }
    }
    best.map(|(state, _)| state.to_owned())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::testing::{brute_force, sample_network};

    fn total(distribution: &Distribution) -> f64 {
        distribution.iter().map(|(_, p)| p).sum()
    }

    #[test]
    fn test_missing_age_gives_recidiva_posterior() {
        let network = sample_network();
        let record: EvidenceRecord = serde_json::from_str(r#"{"edad": null}"#).unwrap();
        let prediction = predict(&record, &network).unwrap();

        assert_eq!(prediction.target, "recidiva");
        assert_eq!(
            prediction.probabilities.keys().collect::<Vec<_>>(),
            ["0", "1"]
        );
        assert_relative_eq!(total(&prediction.probabilities), 1.0, epsilon = 1e-6);
        // absent grado_histologi defaults to "Missing"
        let expected = brute_force(
            &network,
            "recidiva",
            &[("edad", "Missing"), ("grado_histologi", "Missing")],
        );
        assert_relative_eq!(
            prediction.probabilities.get("1").copied().unwrap(),
            expected[1],
            epsilon = 1e-12
        );
        assert_eq!(prediction.most_likely, "0");
    }

    #[test]
    fn test_extraneous_keys_have_no_effect() {
        let network = sample_network();
        let base = EvidenceRecord::new()
            .with("edad", "1.0")
            .with("grado_histologi", "2.0");
        let noisy = base.clone().with("color", "blue").with("lucky_number", 7_i64);
        assert_eq!(
            predict(&base, &network).unwrap(),
            predict(&noisy, &network).unwrap()
        );
    }

    #[test]
    fn test_flexible_query_every_node() {
        let network = sample_network();
        let query = FlexibleQuery {
            targets: network.names().map(str::to_owned).collect(),
            evidence: None,
        };
        let prediction = predict_flexible(&query, &network).unwrap();
        assert_eq!(
            prediction.results.keys().collect::<Vec<_>>(),
            ["edad", "grado_histologi", "recidiva", "estad"]
        );
        for (_, distribution) in prediction.results.iter() {
            assert_relative_eq!(total(distribution), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_flexible_query_without_evidence() {
        let network = sample_network();
        let query: FlexibleQuery = serde_json::from_str(r#"{"targets": ["edad"]}"#).unwrap();
        let prediction = predict_flexible(&query, &network).unwrap();
        let edad = prediction.results.get("edad").unwrap();
        assert_relative_eq!(*edad.get("0.0").unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_flexible_query_with_evidence() {
        let network = sample_network();
        let query = FlexibleQuery {
            targets: vec!["edad".to_owned(), "recidiva".to_owned()],
            evidence: Some(EvidenceRecord::new().with("estad", "muerto")),
        };
        let prediction = predict_flexible(&query, &network).unwrap();
        let recidiva = prediction.results.get("recidiva").unwrap();
        let expected = brute_force(&network, "recidiva", &[("estad", "muerto")]);
        assert_relative_eq!(*recidiva.get("1").unwrap(), expected[1], epsilon = 1e-12);
    }

    #[test]
    fn test_repeated_targets_are_answered_once() {
        let network = sample_network();
        let query = FlexibleQuery {
            targets: vec![
                "recidiva".to_owned(),
                "edad".to_owned(),
                "recidiva".to_owned(),
            ],
            evidence: None,
        };
        let prediction = predict_flexible(&query, &network).unwrap();
        assert_eq!(
            prediction.results.keys().collect::<Vec<_>>(),
            ["recidiva", "edad"]
        );
        let json = serde_json::to_value(&prediction).unwrap();
        assert_eq!(json["results"].as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_observed_target_fails_query() {
        let network = sample_network();
        let query = FlexibleQuery {
            targets: vec!["edad".to_owned(), "estad".to_owned()],
            evidence: Some(EvidenceRecord::new().with("estad", "muerto")),
        };
        let err = predict_flexible(&query, &network).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_unknown_target_fails_whole_query() {
        let network = sample_network();
        let query = FlexibleQuery {
            targets: vec!["recidiva".to_owned(), "nope".to_owned()],
            evidence: None,
        };
        let err = predict_flexible(&query, &network).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "target 'nope' is not a valid node in the network");
    }

    #[test]
    fn test_most_likely_prefers_first_on_ties() {
        let distribution: Distribution = [
            ("a".to_owned(), 0.2),
            ("b".to_owned(), 0.4),
            ("c".to_owned(), 0.4),
        ]
        .into_iter()
        .collect();
        assert_eq!(most_likely(&distribution).as_deref(), Some("b"));
        assert_eq!(most_likely(&Distribution::default()), None);
    }
}
