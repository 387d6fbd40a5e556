use nsmp_cox::{fit::FitOptions, summary};
use serde::{Deserialize, Serialize};

/// Model features used when none are requested explicitly.
///
/// The last three are summary flags, so training on this list requires
/// [`TrainingConfig::summarize_features`].
pub const DEFAULT_FEATURES: &[&str] = &[
    "edad",
    "imc",
    "asa",
    "grado_histologi",
    "tamano_tumoral",
    "infiltracion_mi",
    "afectacion_linf",
    "metasta_distan",
    "recep_est_porcent",
    "rece_de_Ppor",
    "nodal_positive",
    "genetic_test_done",
    "genetic_abnormal",
];

/// Parameters of a training run.
///
/// Missing keys in a JSON config fall back to [`TrainingConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Seed of the train/test shuffle.
    pub seed: u64,
    /// Ridge penalty strength of the Cox fit.
    pub penalizer: f64,
    /// Fraction of the cohort held out; the test size is rounded up.
    pub test_fraction: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Features one-hot encoded even when every value is a number, such as
    /// numerically coded grades or stages.
    pub categorical: Vec<String>,
    /// Derive nodal and genetic summary flags before encoding.
    pub summarize_features: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let fit = FitOptions::default();
        Self {
            seed: 42,
            penalizer: fit.penalizer,
            test_fraction: 0.2,
            max_iterations: fit.max_iterations,
            tolerance: fit.tolerance,
            categorical: Vec::new(),
            summarize_features: false,
        }
    }
}

impl TrainingConfig {
    #[must_use]
    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            penalizer: self.penalizer,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
        }
    }

    #[must_use]
    pub fn with_penalizer(&self, penalizer: f64) -> Self {
        Self {
            penalizer,
            ..self.clone()
        }
    }

    /// Turns on summary features when `features` asks for any summary flag.
    #[must_use]
    pub fn for_features<S>(mut self, features: &[S]) -> Self
    where
        S: AsRef<str>,
    {
        if !self.summarize_features
            && features.iter().any(|f| summary::is_summary_feature(f.as_ref()))
        {
            tracing::info!("summary features requested; deriving summary flags");
            self.summarize_features = true;
        }
        self
    }

    #[must_use]
    pub fn is_categorical(&self, feature: &str) -> bool {
        self.categorical.iter().any(|f| f == feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrainingConfig =
            serde_json::from_str(r#"{"seed": 7, "categorical": ["grado_histologi"]}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.penalizer, 0.1);
        assert_eq!(config.test_fraction, 0.2);
        assert!(config.is_categorical("grado_histologi"));
        assert!(!config.is_categorical("edad"));
    }

    #[test]
    fn test_summary_flags_enable_summarizing() {
        let config = TrainingConfig::default().for_features(&["edad"]);
        assert!(!config.summarize_features);
        let config = TrainingConfig::default().for_features(DEFAULT_FEATURES);
        assert!(config.summarize_features);
    }
}
