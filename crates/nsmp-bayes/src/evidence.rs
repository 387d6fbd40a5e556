//! Raw patient values to evidence states.
//!
//! Network states are strings such as `"1.0"`, `"2"` or `"Missing"`. A raw
//! value maps to the state spelled the way the value prints, so the JSON
//! type matters: `1` is `"1"`, `1.0` is `"1.0"`, `true` is `"True"` and
//! `null` is `"Missing"`.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::network::Network;

/// State name used for missing values.
pub const MISSING: &str = "Missing";

/// One raw evidence value, keeping its JSON type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvidenceValue {
    #[default]
    Missing,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl fmt::Display for EvidenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str(MISSING),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Real(x) => f.write_str(&format_real(*x)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for EvidenceValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<i64> for EvidenceValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for EvidenceValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for EvidenceValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T> From<Option<T>> for EvidenceValue
where
    T: Into<EvidenceValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

/// Shortest round-trip spelling with a fractional marker on integral values
/// (`1.0`) and a signed two-digit exponent outside `[1e-4, 1e16)`.
fn format_real(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_owned();
    }
    if x.is_infinite() {
        return String::from(if x > 0.0 { "inf" } else { "-inf" });
    }
    let debug = format!("{x:?}");
    match debug.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => debug,
    }
}

/// Raw evidence as received: variable name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceRecord(BTreeMap<String, EvidenceValue>);

impl EvidenceRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K, V>(&mut self, name: K, value: V)
    where
        K: Into<String>,
        V: Into<EvidenceValue>,
    {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn with<K, V>(mut self, name: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<EvidenceValue>,
    {
        self.insert(name, value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EvidenceValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EvidenceValue)> + '_ {
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

    /// Adds `Missing` for every name in `fields` that has no value.
    #[must_use]
    pub fn with_defaults<'a, I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        for field in fields {
            self.0.entry(field.to_owned()).or_default();
        }
        self
    }
}

impl<K, V> FromIterator<(K, V)> for EvidenceRecord
where
    K: Into<String>,
    V: Into<EvidenceValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Evidence as states: variable name to state string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Evidence(BTreeMap<String, String>);

impl Evidence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stringifies every value of `record`.
    #[must_use]
    pub fn from_record(record: &EvidenceRecord) -> Self {
        record
            .iter()
            .map(|(name, value)| (name, value.to_string()))
            .collect()
    }

    #[must_use]
    pub fn with<K, V>(mut self, name: K, state: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(name.into(), state.into());
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keeps only variables that are nodes of `network`.
    #[must_use]
    pub fn restricted_to(&self, network: &Network) -> Self {
        let kept: BTreeMap<_, _> = self
            .0
            .iter()
            .filter(|(name, _)| network.contains(name))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if kept.len() < self.0.len() {
            tracing::debug!(
                dropped = self.0.len() - kept.len(),
                "dropped evidence on variables outside the network"
            );
        }
        Self(kept)
    }
}

impl<K, V> FromIterator<(K, V)> for Evidence
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Stringifies `record` and drops variables that are not network nodes.
#[must_use]
pub fn preprocess(record: &EvidenceRecord, network: &Network) -> Evidence {
    Evidence::from_record(record).restricted_to(network)
}
