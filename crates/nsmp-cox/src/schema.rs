//! The explicit column schema of the Cox design matrix.
//!
//! Every design-matrix column knows which raw feature it was derived from and
//! whether it carries the feature's numeric value or a one-hot indicator for
//! one category level. The schema is persisted with the artifacts, so column
//! order is an explicit contract rather than a side effect of encoding.

use std::collections::HashMap;

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// How a design-matrix column is derived from its raw feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnKind {
    /// The (imputed) numeric value of `feature`.
    Numeric { feature: String },
    /// `1` when `feature` takes category `level`, `0` otherwise.
    Indicator { feature: String, level: String },
}

impl ColumnKind {
    #[must_use]
    pub fn feature(&self) -> &str {
        match self {
            Self::Numeric { feature } | Self::Indicator { feature, .. } => feature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(flatten)]
    pub kind: ColumnKind,
}

impl Column {
    #[must_use]
    pub fn numeric(feature: &str) -> Self {
        Self {
            name: feature.to_owned(),
            kind: ColumnKind::Numeric {
                feature: feature.to_owned(),
            },
        }
    }

    /// An indicator column named `{feature}_{level}`.
    #[must_use]
    pub fn indicator(feature: &str, level: &str) -> Self {
        Self {
            name: indicator_name(feature, level),
            kind: ColumnKind::Indicator {
                feature: feature.to_owned(),
                level: level.to_owned(),
            },
        }
    }
}

/// Name of the one-hot column for `level` of `feature`.
#[must_use]
pub fn indicator_name(feature: &str, level: &str) -> String {
    format!("{feature}_{level}")
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ColumnSchemaError {
    #[display("duplicate column '{name}'")]
    Duplicate { name: String },
    #[display("column '{name}' does not derive from any final feature")]
    Unresolved { name: String },
}

/// Ordered list of design-matrix columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Column>", into = "Vec<Column>")]
pub struct ColumnSchema {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
}

impl TryFrom<Vec<Column>> for ColumnSchema {
    type Error = ColumnSchemaError;

    fn try_from(columns: Vec<Column>) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<ColumnSchema> for Vec<Column> {
    fn from(schema: ColumnSchema) -> Self {
        schema.columns
    }
}

impl ColumnSchema {
    pub fn new(columns: Vec<Column>) -> Result<Self, ColumnSchemaError> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            if index.insert(column.name.clone(), i).is_some() {
                return Err(ColumnSchemaError::Duplicate {
                    name: column.name.clone(),
                });
            }
        }
        Ok(Self { columns, index })
    }

    /// Re-derives the schema from a bare column-name list.
    ///
    /// A column whose name equals a feature is numeric. Any other column is
    /// an indicator of the feature forming the longest `{feature}_` prefix of
    /// its name; the remainder of the name is the level.
    pub fn resolve<S, T>(final_features: &[S], train_columns: &[T]) -> Result<Self, ColumnSchemaError>
    where
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let columns = train_columns
            .iter()
            .map(|name| {
                let name = name.as_ref();
                if final_features.iter().any(|f| f.as_ref() == name) {
                    return Ok(Column::numeric(name));
                }
                final_features
                    .iter()
                    .map(AsRef::as_ref)
                    .filter(|f| {
                        name.len() > f.len() + 1
                            && name.starts_with(f)
                            && name.as_bytes()[f.len()] == b'_'
                    })
                    .max_by_key(|f| f.len())
                    .map(|f| Column::indicator(f, &name[f.len() + 1..]))
                    .ok_or_else(|| ColumnSchemaError::Unresolved {
                        name: name.to_owned(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(columns)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| c.name.as_str())
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Whether `feature` is encoded as a numeric column.
    #[must_use]
    pub fn is_numeric(&self, feature: &str) -> bool {
        self.columns
            .iter()
            .any(|c| matches!(&c.kind, ColumnKind::Numeric { feature: f } if f == feature))
    }

    /// Places `entries` onto the schema.
    ///
    /// Entries naming a schema column set that column; every other schema
    /// column is `0`. Entries outside the schema are dropped.
    pub fn reindex<I, S>(&self, entries: I) -> DesignRow<'_>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut values = Array1::zeros(self.len());
        for (name, value) in entries {
            let name = name.as_ref();
            match self.position(name) {
                Some(i) => values[i] = value,
                None => tracing::trace!(column = name, "dropping column outside the schema"),
            }
        }
        DesignRow {
            schema: self,
            values,
        }
    }
}

/// One numeric row indexed by a [`ColumnSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct DesignRow<'a> {
    schema: &'a ColumnSchema,
    values: Array1<f64>,
}

impl<'a> DesignRow<'a> {
    #[must_use]
    pub fn schema(&self) -> &'a ColumnSchema {
        self.schema
    }

    #[must_use]
    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema.position(name).map(|i| self.values[i])
    }

    /// Column name and value pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, f64)> + '_ {
        self.schema.names().zip(self.values.iter().copied())
    }
}
