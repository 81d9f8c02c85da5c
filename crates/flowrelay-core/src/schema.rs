//! Column mappings: which spreadsheet columns become which record fields.
//!
//! A [`MappingSpec`] is plain configuration. The [`MappingRegistry`] is built
//! once at startup and handed to the [`Mapper`](crate::mapper::Mapper);
//! nothing is discovered from the filesystem.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MapError;

/// Coercion applied to a cell before it lands in a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Blank → `Null`, anything else → its string form.
    String,
    /// Blank or unparseable → `0`, otherwise the integer prefix.
    Int,
    /// Blank or unparseable → `0.0`, otherwise the decimal prefix.
    Float,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
        }
    }
}

/// One column → field rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Header text in the source sheet.
    pub source: String,
    /// Field name in the produced record.
    pub target: String,
    pub kind: FieldKind,
    /// Row is invalid when this field is null or empty.
    #[serde(default)]
    pub required: bool,
    /// Row is invalid when this field is zero, null or empty.
    #[serde(default)]
    pub nonzero: bool,
}

impl FieldSpec {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            required: false,
            nonzero: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nonzero(mut self) -> Self {
        self.nonzero = true;
        self
    }
}

/// A named set of field rules for one kind of sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSpec {
    /// Mapping type, e.g. `"materials"`.
    pub name: String,
    pub display_name: String,
    pub table_name: String,
    pub fields: Vec<FieldSpec>,
}

/// Row filter policy for the built-in `materials` mapping.
///
/// Deployments pick one explicitly; both are never active at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaterialsPolicy {
    /// Only the product code must be present.
    KeyOnly,
    /// Product code present and every price / tax field nonzero.
    #[default]
    NonZeroPrices,
}

impl MappingSpec {
    /// The materials sheet (产品编码 / 产品名称 / 采购价 / 税点 / 不含税采购价).
    pub fn materials(policy: MaterialsPolicy) -> Self {
        let strict = policy == MaterialsPolicy::NonZeroPrices;
        let numeric = |source: &str, target: &str, kind: FieldKind| {
            let spec = FieldSpec::new(source, target, kind);
            if strict {
                spec.nonzero()
            } else {
                spec
            }
        };

        Self {
            name: "materials".into(),
            display_name: "材料表".into(),
            table_name: "materials".into(),
            fields: vec![
                FieldSpec::new("产品编码", "number", FieldKind::String).required(),
                FieldSpec::new("产品名称", "name", FieldKind::String),
                numeric("采购价", "purchasePrice", FieldKind::Float),
                numeric("税点", "taxRate", FieldKind::Int),
                numeric("不含税采购价", "untaxedPurchasePrice", FieldKind::Float),
            ],
        }
    }

    /// Look up the rule for a header, if the header is mapped.
    pub fn field_for(&self, header: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.source == header)
    }

    /// Source column names, in declaration order.
    pub fn source_columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.source.as_str())
    }
}

/// Registry of mapping specs keyed by mapping type.
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    specs: IndexMap<String, MappingSpec>,
}

impl MappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in `materials` mapping under `policy`.
    pub fn with_builtin(policy: MaterialsPolicy) -> Self {
        let mut registry = Self::new();
        registry.register(MappingSpec::materials(policy));
        registry
    }

    /// Add or replace a spec under its own name.
    pub fn register(&mut self, spec: MappingSpec) {
        self.specs.insert(spec.name.clone(), spec);
    }

    pub fn get(&self, name: &str) -> Result<&MappingSpec, MapError> {
        self.specs
            .get(name)
            .ok_or_else(|| MapError::UnsupportedMappingKind(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn specs(&self) -> impl Iterator<Item = &MappingSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materials_policy_controls_nonzero_flags() {
        let strict = MappingSpec::materials(MaterialsPolicy::NonZeroPrices);
        let loose = MappingSpec::materials(MaterialsPolicy::KeyOnly);

        assert!(strict.field_for("采购价").unwrap().nonzero);
        assert!(strict.field_for("税点").unwrap().nonzero);
        assert!(!loose.field_for("采购价").unwrap().nonzero);
        assert!(strict.field_for("产品编码").unwrap().required);
        assert!(loose.field_for("产品编码").unwrap().required);
    }

    #[test]
    fn unknown_mapping_is_rejected() {
        let registry = MappingRegistry::with_builtin(MaterialsPolicy::default());
        assert!(registry.get("materials").is_ok());
        assert_eq!(
            registry.get("orders").unwrap_err(),
            MapError::UnsupportedMappingKind("orders".into())
        );
    }

    #[test]
    fn field_spec_deserializes_with_defaults() {
        let spec: FieldSpec = serde_json::from_str(
            r#"{"source":"数量","target":"qty","kind":"int"}"#,
        )
        .unwrap();
        assert_eq!(spec.kind, FieldKind::Int);
        assert!(!spec.required && !spec.nonzero);
    }
}
