//! Typed patient records for the Cox model.
//!
//! A record maps feature names to [`FeatureValue`]s. Missing values are an
//! explicit variant: JSON `null` and absent keys both read as
//! [`FeatureValue::Missing`].

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// A single raw feature value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    #[default]
    Missing,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FeatureValue {
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Casts the value to a number.
    ///
    /// Numbers pass through, booleans become `0`/`1` and text is parsed after
    /// trimming. `Missing` and `NaN` (including the text `"nan"`) read as
    /// `Ok(None)`. Unparseable text is returned as `Err` with the offending
    /// text.
    pub fn to_number(&self) -> Result<Option<f64>, &str> {
        let value = match self {
            Self::Missing => return Ok(None),
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::Text(text) => text.trim().parse::<f64>().map_err(|_| text.as_str())?,
        };
        Ok((!value.is_nan()).then_some(value))
    }

    /// The category label used in one-hot column names.
    ///
    /// Integral numbers render without a fractional part (`2.0` → `"2"`), so
    /// numerically coded categories produce columns such as
    /// `grado_histologi_2`. Booleans read as `1`/`0`. Returns `None` for
    /// missing values.
    #[must_use]
    pub fn level_label(&self) -> Option<String> {
        match self {
            Self::Missing => None,
            Self::Bool(b) => Some(u8::from(*b).to_string()),
            Self::Number(n) if n.is_nan() => None,
            Self::Number(n) => Some(format_level(*n)),
            Self::Text(text) => Some(text.clone()),
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("null"),
            Self::Bool(b) => fmt::Display::fmt(b, f),
            Self::Number(n) => fmt::Display::fmt(n, f),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl<T> From<Option<T>> for FeatureValue
where
    T: Into<FeatureValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

fn format_level(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        // adding 0.0 turns -0.0 into 0.0
        format!("{:.0}", value + 0.0)
    } else {
        value.to_string()
    }
}

/// A raw patient record: feature name → value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientRecord(BTreeMap<String, FeatureValue>);

static MISSING: FeatureValue = FeatureValue::Missing;

impl PatientRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `feature`, or [`FeatureValue::Missing`] if absent.
    #[must_use]
    pub fn get(&self, feature: &str) -> &FeatureValue {
        self.0.get(feature).unwrap_or(&MISSING)
    }

    pub fn insert<K, V>(&mut self, feature: K, value: V)
    where
        K: Into<String>,
        V: Into<FeatureValue>,
    {
        self.0.insert(feature.into(), value.into());
    }

    #[must_use]
    pub fn with<K, V>(mut self, feature: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FeatureValue>,
    {
        self.insert(feature, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for PatientRecord
where
    K: Into<String>,
    V: Into<FeatureValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
