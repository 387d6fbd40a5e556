//! Declared evidence fields of the Bayesian predictor and the variables it can
//! be queried for.

use serde::Serialize;

use crate::{
    SchemaError,
    evidence::{EvidenceRecord, EvidenceValue, MISSING},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateConstraints {
    pub allowed_values: &'static [&'static str],
    pub default: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceField {
    pub internal_name: &'static str,
    pub external_name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub required: bool,
    pub description: &'static str,
    pub constraints: StateConstraints,
}

impl EvidenceField {
    const fn new(
        internal_name: &'static str,
        external_name: &'static str,
        description: &'static str,
        allowed_values: &'static [&'static str],
    ) -> Self {
        Self {
            internal_name,
            external_name,
            kind: "string",
            required: false,
            description,
            constraints: StateConstraints {
                allowed_values,
                default: MISSING,
            },
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Checks the record's value for this field.
    ///
    /// A required field must be present and not null; a present value must
    /// spell one of the allowed states.
    pub fn check(&self, record: &EvidenceRecord) -> Result<(), SchemaError> {
        let value = match record.get(self.internal_name) {
            None | Some(EvidenceValue::Missing) if self.required => {
                return Err(SchemaError::MissingRequired {
                    field: self.internal_name.to_owned(),
                });
            }
            None => return Ok(()),
            Some(value) => value,
        };
        let state = value.to_string();
        if self.constraints.allowed_values.contains(&state.as_str()) {
            Ok(())
        } else {
            Err(SchemaError::UnknownState {
                variable: self.internal_name.to_owned(),
                state,
                allowed: self
                    .constraints
                    .allowed_values
                    .iter()
                    .map(|&s| s.to_owned())
                    .collect(),
            })
        }
    }
}

const BINARY: &[&str] = &["0.0", "1.0", MISSING];
const FOUR_GROUPS: &[&str] = &["0.0", "1.0", "2.0", "3.0", MISSING];

/// Variables clients may ask posteriors for.
pub const TARGETS: &[&str] = &[
    "edad",
    "asa",
    "grupo_riesgo",
    "imc",
    "tipo_histologico",
    "Grado",
    "valor_de_ca125",
    "ecotv_infiltsub",
    "ecotv_infiltobj",
    "estadiaje_pre_i",
    "metasta_distan",
    "tto_NA",
    "tto_1_quirugico",
    "histo_defin",
    "grado_histologi",
    "tamano_tumoral",
    "afectacion_linf",
    "AP_centinela_pelvico",
    "AP_ganPelv",
    "AP_glanPaor",
    "estudio_genetico_r01",
    "grupo_de_riesgo_definitivo",
    "beta_cateninap",
    "recep_est_porcent",
    "rece_de_Ppor",
    "FIGO2023",
    "Tributaria_a_Radioterapia",
    "Tratamiento_RT",
    "Tratamiento_sistemico",
    "recidiva",
    "numero_de_recid",
    "dx_recidiva",
    "tto_recidiva",
    "Tt_recidiva_qx",
    "Reseccion_macroscopica_complet",
    "libre_enferm",
    "estad",
    "causa_muerte",
];

/// The evidence schema clients see for the Bayesian predictor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceCatalog {
    pub model: &'static str,
    pub fields: Vec<EvidenceField>,
    pub targets: &'static [&'static str],
}

impl EvidenceCatalog {
    /// Evidence fields of the NSMP recurrence network.
    #[must_use]
    pub fn nsmp() -> Self {
        let fields = vec![
            EvidenceField::new(
                "edad",
                "Age group",
                "Discretized age group used by the Bayesian Network",
                FOUR_GROUPS,
            )
            .required(),
            EvidenceField::new("imc", "BMI group", "Discretized body mass index group", FOUR_GROUPS),
            EvidenceField::new(
                "asa",
                "ASA score",
                "Discretized ASA physical status category",
                &["0.0", "1.0", "2.0", MISSING],
            ),
            EvidenceField::new(
                "grado_histologi",
                "Histological grade",
                "Discretized tumor histological grade",
                &["1.0", "2.0", MISSING],
            )
            .required(),
            EvidenceField::new(
                "tamano_tumoral",
                "Tumor size group",
                "Discretized tumor size category",
                FOUR_GROUPS,
            ),
            EvidenceField::new(
                "afectacion_linf",
                "Lymphovascular space invasion",
                "Discretized lymphovascular invasion status",
                BINARY,
            ),
            EvidenceField::new(
                "metasta_distan",
                "Distant metastasis",
                "Discretized distant metastasis status",
                BINARY,
            )
            .required(),
            EvidenceField::new(
                "recep_est_porcent",
                "Estrogen receptor group",
                "Discretized estrogen receptor expression",
                &["-1.0", "0.0", "1.0", "2.0", MISSING],
            ),
            EvidenceField::new(
                "rece_de_Ppor",
                "Progesterone receptor group",
                "Discretized progesterone receptor expression",
                &["-1.0", "0.0", "1.0", "2.0", "3.0", MISSING],
            ),
            EvidenceField::new(
                "estudio_genetico_r01",
                "Genetic study performed",
                "Whether a genetic study was performed",
                BINARY,
            ),
            EvidenceField::new(
                "FIGO2023",
                "FIGO stage (2023)",
                "Discretized FIGO 2023 surgical stage",
                &[
                    "1.0", "2.0", "4.0", "6.0", "7.0", "8.0", "9.0", "10.0", "11.0", "12.0",
                    "13.0", "14.0", MISSING,
                ],
            )
            .required(),
        ];
        Self {
            model: "PatientInput",
            fields,
            targets: TARGETS,
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EvidenceField> {
        self.fields.iter().find(|f| f.internal_name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.internal_name)
    }

    /// Checks every declared field; undeclared keys are ignored.
    pub fn validate(&self, record: &EvidenceRecord) -> Result<(), SchemaError> {
        self.fields.iter().try_for_each(|field| field.check(record))
    }
}
