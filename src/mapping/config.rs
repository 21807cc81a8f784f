//! Mapping configuration types
//!
//! Deserialized from YAML (or JSON, which YAML accepts). Declaration order of
//! entities and properties is preserved.
//!
//! ```yaml
//! filters:
//!   status: active
//! entities:
//!   company:
//!     schema: Company
//!     keys: [company_number]
//!     properties:
//!       name: { column: company_name }
//!       jurisdiction: { literal: gb }
//!   director:
//!     schema: Person
//!     key: [director_name, birth_date]
//!     properties:
//!       name: { column: director_name, required: true }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::MappingError;

/// A field that accepts either a single value or a list
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value).iter(),
            OneOrMany::Many(values) => values.iter(),
        }
    }
}

/// A scalar literal as written in configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    /// Text form, rendered the way record values are so filters compare equal
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Text(s) => s.clone(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => serde_json::Number::from_f64(*f)
                .map(|n| n.to_string())
                .unwrap_or_else(|| f.to_string()),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

/// Merge two singular/plural fields, keeping first-occurrence order and
/// dropping duplicates
fn merge_texts<T, F>(a: Option<&OneOrMany<T>>, b: Option<&OneOrMany<T>>, to_text: F) -> Vec<String>
where
    F: Fn(&T) -> String,
{
    let mut merged: Vec<String> = Vec::new();
    for value in a.into_iter().chain(b).flat_map(OneOrMany::iter) {
        let text = to_text(value);
        if !merged.contains(&text) {
            merged.push(text);
        }
    }
    merged
}

// ============================================================================
// ENTITY CONFIG
// ============================================================================

/// Declaration of one entity mapping
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EntityConfig {
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub key: Option<OneOrMany<String>>,
    #[serde(default)]
    pub keys: Option<OneOrMany<String>>,
    #[serde(default)]
    pub id_column: Option<String>,
    /// Constant folded into the key seed
    #[serde(default)]
    pub key_literal: Option<Scalar>,
    #[serde(default)]
    pub properties: IndexMap<String, PropertySpec>,
}

impl EntityConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, MappingError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Key columns from `key` and `keys` combined
    pub fn key_columns(&self) -> Vec<String> {
        merge_texts(self.key.as_ref(), self.keys.as_ref(), String::clone)
    }
}

/// Declaration of how one property is populated from a record
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PropertySpec {
    #[serde(default)]
    pub column: Option<OneOrMany<String>>,
    #[serde(default)]
    pub columns: Option<OneOrMany<String>>,
    #[serde(default)]
    pub literal: Option<OneOrMany<Scalar>>,
    #[serde(default)]
    pub literals: Option<OneOrMany<Scalar>>,
    /// `{{column}}` placeholders replaced from the record
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub join: Option<String>,
    #[serde(default)]
    pub split: Option<String>,
    /// Name of a sibling entity mapping whose id becomes the value
    #[serde(default)]
    pub entity: Option<String>,
    /// Skip the whole entity when this property ends up empty
    #[serde(default)]
    pub required: bool,
}

impl PropertySpec {
    pub fn column_names(&self) -> Vec<String> {
        merge_texts(self.column.as_ref(), self.columns.as_ref(), String::clone)
    }

    pub fn literal_values(&self) -> Vec<String> {
        merge_texts(self.literal.as_ref(), self.literals.as_ref(), Scalar::to_text)
    }
}

// ============================================================================
// QUERY CONFIG
// ============================================================================

/// A set of entity mappings applied to the same records
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct QueryConfig {
    #[serde(default)]
    pub entities: IndexMap<String, EntityConfig>,
    /// Records pass only if each column holds one of the listed values
    #[serde(default)]
    pub filters: IndexMap<String, OneOrMany<Scalar>>,
    /// Records are dropped if any column holds one of the listed values
    #[serde(default)]
    pub filters_not: IndexMap<String, OneOrMany<Scalar>>,
}

impl QueryConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, MappingError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}
