//! Declared Cox patient input fields.
//!
//! The catalog is what clients see as the input schema. It is validated
//! against a record before prediction and checked against the trained
//! model's `final_features` so the two cannot drift apart silently.

use serde::Serialize;

use crate::{SchemaError, record::PatientRecord, summary};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<&'static [f64]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub internal_name: &'static str,
    pub external_name: &'static str,
    pub required: bool,
    pub description: &'static str,
    pub constraints: Constraints,
}

impl FieldSpec {
    fn optional(internal_name: &'static str, external_name: &'static str, description: &'static str) -> Self {
        Self {
            internal_name,
            external_name,
            required: false,
            description,
            constraints: Constraints::default(),
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn min(mut self, min: f64) -> Self {
        self.constraints.min = Some(min);
        self
    }

    fn max(mut self, max: f64) -> Self {
        self.constraints.max = Some(max);
        self
    }

    fn unit(mut self, unit: &'static str) -> Self {
        self.constraints.unit = Some(unit);
        self
    }

    fn allowed(mut self, values: &'static [f64]) -> Self {
        self.constraints.allowed_values = Some(values);
        self
    }

    fn default_value(mut self, value: f64) -> Self {
        self.constraints.default = Some(value);
        self
    }

    /// Checks one record value against this field.
    pub fn check(&self, record: &PatientRecord) -> Result<(), SchemaError> {
        let name = self.internal_name;
        let value = record
            .get(name)
            .to_number()
            .map_err(|text| SchemaError::NotNumeric {
                feature: name.to_owned(),
                value: text.to_owned(),
            })?;
        let Some(value) = value else {
            return if self.required {
                Err(SchemaError::MissingRequired {
                    field: name.to_owned(),
                })
            } else {
                Ok(())
            };
        };

        let out_of_range = |reason: String| SchemaError::OutOfRange {
            field: name.to_owned(),
            value,
            reason,
        };
        let c = &self.constraints;
        if let Some(min) = c.min.filter(|&min| value < min) {
            return Err(out_of_range(format!("below minimum {min}")));
        }
        if let Some(max) = c.max.filter(|&max| value > max) {
            return Err(out_of_range(format!("above maximum {max}")));
        }
        match c.allowed_values {
            Some(allowed) if !allowed.iter().any(|a| (a - value).abs() < f64::EPSILON) => {
                Err(out_of_range(format!("not one of {allowed:?}")))
            }
            _ => Ok(()),
        }
    }
}

/// The declared input fields of the Cox model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCatalog {
    pub model: &'static str,
    pub fields: Vec<FieldSpec>,
}

const BINARY: &[f64] = &[0.0, 1.0];

const GENETIC_TITLES: [&str; 6] = [
    "Genetic study result 1",
    "Genetic study result 2",
    "Genetic study result 3",
    "Genetic study result 4",
    "Genetic study result 5",
    "Genetic study result 6",
];

impl FieldCatalog {
    /// Input fields of the NSMP recurrence model.
    #[must_use]
    pub fn nsmp() -> Self {
        let mut fields = vec![
            FieldSpec::optional("edad", "Age", "Age at diagnosis (years)")
                .required()
                .min(18.0)
                .max(100.0)
                .default_value(18.0),
            FieldSpec::optional("imc", "Body Mass Index", "Body Mass Index (kg/m²)")
                .min(10.0)
                .max(60.0)
                .unit("kg/m²")
                .default_value(10.0),
            FieldSpec::optional(
                "asa",
                "ASA score",
                "American Society of Anesthesiologists physical status",
            )
            .allowed(&[1.0, 2.0, 3.0, 4.0])
            .default_value(1.0),
            FieldSpec::optional("grado_histologi", "Histological grade", "Tumor histological grade")
                .required()
                .allowed(&[1.0, 2.0, 3.0])
                .default_value(1.0),
            FieldSpec::optional("tamano_tumoral", "Tumor size", "Maximum tumor diameter (cm)")
                .min(0.0)
                .unit("cm")
                .default_value(1.0),
            FieldSpec::optional(
                "infiltracion_mi",
                "Myometrial invasion",
                "Presence of myometrial invasion",
            )
            .allowed(BINARY)
            .default_value(0.0),
            FieldSpec::optional(
                "afectacion_linf",
                "Lymphovascular space invasion (LVSI)",
                "Presence of lymphovascular invasion",
            )
            .allowed(BINARY)
            .default_value(0.0),
            FieldSpec::optional(
                "metasta_distan",
                "Distant metastasis",
                "Presence of distant metastasis at diagnosis",
            )
            .required()
            .allowed(BINARY)
            .default_value(0.0),
            FieldSpec::optional(
                "n_GC_Afect",
                "Positive sentinel lymph nodes",
                "Number of affected sentinel lymph nodes",
            )
            .min(0.0)
            .default_value(0.0),
            FieldSpec::optional(
                "n_gangP_afec",
                "Positive pelvic lymph nodes",
                "Number of affected pelvic lymph nodes",
            )
            .min(0.0)
            .default_value(0.0),
            FieldSpec::optional(
                "n_ganPaor_InfrM_afec",
                "Positive para-aortic nodes (infra-mesenteric)",
                "Number of affected para-aortic lymph nodes (infra-mesenteric)",
            )
            .min(0.0)
            .default_value(0.0),
            FieldSpec::optional(
                "n_ganPaor_Sup_afec",
                "Positive para-aortic nodes (supra-mesenteric)",
                "Number of affected para-aortic lymph nodes (supra-mesenteric)",
            )
            .min(0.0)
            .default_value(0.0),
            FieldSpec::optional(
                "recep_est_porcent",
                "Estrogen receptor expression",
                "Percentage of estrogen receptor expression",
            )
            .min(0.0)
            .max(100.0)
            .unit("%")
            .default_value(0.0),
            FieldSpec::optional(
                "rece_de_Ppor",
                "Progesterone receptor expression",
                "Percentage of progesterone receptor expression",
            )
            .min(0.0)
            .max(100.0)
            .unit("%")
            .default_value(0.0),
        ];
        fields.extend(
            summary::GENETIC_FEATURES
                .into_iter()
                .zip(GENETIC_TITLES)
                .map(|(name, title)| {
                    FieldSpec::optional(name, title, "Genetic study performed (flag)")
                        .allowed(BINARY)
                        .default_value(0.0)
                }),
        );
        fields.push(
            FieldSpec::optional("FIGO2023", "FIGO stage (2023)", "Final surgical FIGO stage")
                .required()
                .allowed(&[1.0, 2.0, 3.0, 4.0])
                .default_value(0.0),
        );

        Self {
            model: "PatientInput",
            fields,
        }
    }

    #[must_use]
    pub fn get(&self, internal_name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.internal_name == internal_name)
    }

    /// Checks every declared field of `record`. Undeclared keys are ignored.
    pub fn validate(&self, record: &PatientRecord) -> Result<(), SchemaError> {
        self.fields.iter().try_for_each(|field| field.check(record))
    }

    /// Model features that no declared field (or derived summary flag) covers.
    #[must_use]
    pub fn uncovered<'a, S>(&self, final_features: &'a [S]) -> Vec<&'a str>
    where
        S: AsRef<str>,
    {
        final_features
            .iter()
            .map(AsRef::as_ref)
            .filter(|f| self.get(f).is_none() && !summary::is_summary_feature(f))
            .collect()
    }
}
