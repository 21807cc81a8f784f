//! Resolved schema definitions
//!
//! A `Schema` carries its own properties plus every property inherited from
//! the schemata it extends. Inheritance is flattened once, when the `Model`
//! is built, so lookups never walk the `extends` chain.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::types::PropertyType;

/// A single property of a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub type_: PropertyType,
    /// Target schema for entity-typed properties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    /// Name of the schema that declared this property
    pub schema: String,
}

impl Property {
    pub fn is_country(&self) -> bool {
        self.type_ == PropertyType::Country
    }

    /// Qualified name, e.g. `Person:nationality`
    pub fn qname(&self) -> String {
        format!("{}:{}", self.schema, self.name)
    }
}

/// A schema with inheritance resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub name: String,
    pub label: String,
    #[serde(rename = "abstract")]
    pub abstract_: bool,
    pub extends: Vec<String>,
    /// This schema plus every ancestor
    #[serde(skip)]
    pub(crate) lineage: BTreeSet<String>,
    pub(crate) properties: IndexMap<String, Property>,
}

impl Schema {
    /// Look up a property by name, including inherited ones
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// True if this schema is `other` or descends from it
    pub fn is_a(&self, other: &str) -> bool {
        self.lineage.contains(other)
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
