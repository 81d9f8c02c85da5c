//! Coerced record values.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single coerced scalar.
///
/// Serialises as the bare JSON scalar so a batch of records goes over the
/// wire as a plain array of objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Int(i64),
    Float(f64),
    String(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Null or an empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Blank, or a numeric zero.
    pub fn is_zero_or_blank(&self) -> bool {
        match self {
            Self::Int(n) => *n == 0,
            Self::Float(f) => *f == 0.0,
            other => other.is_blank(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

/// One mapped row: target field name → coerced value.
///
/// Field order follows the header order of the source row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used by the mapper and in tests.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub(crate) fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        self.fields.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Field value, treating an absent field as `Null`.
    pub fn value(&self, field: &str) -> &FieldValue {
        self.fields.get(field).unwrap_or(&FieldValue::Null)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_plain_object() {
        let rec = Record::new()
            .with("number", "A1")
            .with("taxRate", 13i64)
            .with("name", FieldValue::Null);
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(json, r#"{"number":"A1","taxRate":13,"name":null}"#);
    }

    #[test]
    fn zero_and_blank_checks() {
        assert!(FieldValue::Null.is_zero_or_blank());
        assert!(FieldValue::String(String::new()).is_zero_or_blank());
        assert!(FieldValue::Int(0).is_zero_or_blank());
        assert!(FieldValue::Float(0.0).is_zero_or_blank());
        assert!(!FieldValue::Float(0.5).is_zero_or_blank());
        assert!(!FieldValue::String("0".into()).is_blank());
    }

    #[test]
    fn missing_field_reads_as_null() {
        let rec = Record::new().with("number", "A1");
        assert!(rec.value("name").is_null());
    }
}
