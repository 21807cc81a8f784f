//! Schema model registry
//!
//! Loads schema definitions from YAML, flattens inheritance, and validates
//! entity ranges. The resulting `Model` is read-only and cheap to share.
//!
//! ```yaml
//! schemata:
//!   Thing:
//!     abstract: true
//!     properties:
//!       name: { type: name }
//!   Person:
//!     extends: [Thing]
//!     properties:
//!       nationality: { type: country }
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::proxy::EntityProxy;
use crate::schema::{Property, Schema};
use crate::types::PropertyType;

/// Errors raised while building a model or reading entities against it
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to parse model: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Schema '{schema}' extends unknown schema '{parent}'")]
    UnknownParent { schema: String, parent: String },

    #[error("Schema inheritance cycle through '{schema}'")]
    InheritanceCycle { schema: String },

    #[error("Property '{property}' has unknown range '{range}'")]
    UnknownRange { property: String, range: String },

    #[error("Entity property '{property}' has no range")]
    MissingRange { property: String },

    #[error("Unknown schema: {0}")]
    UnknownSchema(String),

    #[error("Invalid entity: {0}")]
    InvalidEntity(String),
}

// ============================================================================
// YAML SHAPE
// ============================================================================

#[derive(Debug, Deserialize)]
struct ModelSpec {
    #[serde(default)]
    schemata: IndexMap<String, SchemaSpec>,
}

#[derive(Debug, Deserialize)]
struct SchemaSpec {
    #[serde(default)]
    label: Option<String>,
    #[serde(default, rename = "abstract")]
    abstract_: bool,
    #[serde(default)]
    extends: Vec<String>,
    #[serde(default)]
    properties: IndexMap<String, PropertySpec>,
}

#[derive(Debug, Deserialize)]
struct PropertySpec {
    #[serde(default)]
    label: Option<String>,
    #[serde(default, rename = "type")]
    type_: PropertyType,
    #[serde(default)]
    range: Option<String>,
}

// ============================================================================
// MODEL
// ============================================================================

/// Registry of resolved schemata
#[derive(Debug, Clone, Default)]
pub struct Model {
    schemata: IndexMap<String, Arc<Schema>>,
}

impl Model {
    /// Build a model from its YAML definition
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ModelError> {
        let spec: ModelSpec = serde_yaml::from_str(yaml)?;

        let mut resolved: IndexMap<String, Schema> = IndexMap::new();
        let mut visiting: Vec<String> = Vec::new();
        for name in spec.schemata.keys() {
            resolve_schema(name, &spec.schemata, &mut resolved, &mut visiting)?;
        }

        // Entity ranges can only be checked once every schema exists
        for schema in resolved.values() {
            for prop in schema.properties.values() {
                if prop.type_ != PropertyType::Entity {
                    continue;
                }
                match &prop.range {
                    None => {
                        return Err(ModelError::MissingRange {
                            property: prop.qname(),
                        })
                    }
                    Some(range) if !resolved.contains_key(range) => {
                        return Err(ModelError::UnknownRange {
                            property: prop.qname(),
                            range: range.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        info!("Loaded model with {} schemata", resolved.len());

        Ok(Self {
            schemata: resolved
                .into_iter()
                .map(|(name, schema)| (name, Arc::new(schema)))
                .collect(),
        })
    }

    /// Resolve a schema by name
    pub fn get(&self, name: &str) -> Option<&Arc<Schema>> {
        self.schemata.get(name)
    }

    /// Resolve a property of a named schema
    pub fn get_property(&self, schema: &str, property: &str) -> Option<&Property> {
        self.get(schema).and_then(|s| s.get(property))
    }

    /// Create an empty entity of the named schema
    pub fn make_entity(&self, schema: &str) -> Result<EntityProxy, ModelError> {
        let schema = self
            .get(schema)
            .ok_or_else(|| ModelError::UnknownSchema(schema.to_string()))?;
        Ok(EntityProxy::new(Arc::clone(schema)))
    }

    /// Read an entity from its JSON form (`{id, schema, properties}`)
    pub fn entity_from_json(&self, value: &JsonValue) -> Result<EntityProxy, ModelError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ModelError::InvalidEntity("expected a JSON object".to_string()))?;
        let schema = obj
            .get("schema")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| ModelError::InvalidEntity("missing 'schema'".to_string()))?;

        let mut proxy = self.make_entity(schema)?;
        proxy.id = obj.get("id").and_then(JsonValue::as_str).map(str::to_string);

        if let Some(props) = obj.get("properties").and_then(JsonValue::as_object) {
            for (name, values) in props {
                let prop = proxy.schema().get(name).cloned().ok_or_else(|| {
                    ModelError::InvalidEntity(format!("unknown property '{name}' on {schema}"))
                })?;
                let values: Vec<&str> = match values {
                    JsonValue::Array(items) => items.iter().filter_map(JsonValue::as_str).collect(),
                    JsonValue::String(s) => vec![s.as_str()],
                    _ => Vec::new(),
                };
                proxy.add(&prop, values);
            }
        }

        Ok(proxy)
    }
}

fn resolve_schema(
    name: &str,
    specs: &IndexMap<String, SchemaSpec>,
    resolved: &mut IndexMap<String, Schema>,
    visiting: &mut Vec<String>,
) -> Result<(), ModelError> {
    if resolved.contains_key(name) {
        return Ok(());
    }
    if visiting.iter().any(|v| v == name) {
        return Err(ModelError::InheritanceCycle {
            schema: name.to_string(),
        });
    }
    let Some(spec) = specs.get(name) else {
        return Err(ModelError::UnknownSchema(name.to_string()));
    };

    visiting.push(name.to_string());

    let mut lineage = BTreeSet::from([name.to_string()]);
    let mut properties: IndexMap<String, Property> = IndexMap::new();

    for parent in &spec.extends {
        if !specs.contains_key(parent) {
            return Err(ModelError::UnknownParent {
                schema: name.to_string(),
                parent: parent.clone(),
            });
        }
        resolve_schema(parent, specs, resolved, visiting)?;
        if let Some(parent_schema) = resolved.get(parent) {
            lineage.extend(parent_schema.lineage.iter().cloned());
            for (prop_name, prop) in &parent_schema.properties {
                properties
                    .entry(prop_name.clone())
                    .or_insert_with(|| prop.clone());
            }
        }
    }

    // Own properties override inherited ones
    for (prop_name, prop_spec) in &spec.properties {
        properties.insert(
            prop_name.clone(),
            Property {
                name: prop_name.clone(),
                label: prop_spec.label.clone().unwrap_or_else(|| prop_name.clone()),
                type_: prop_spec.type_,
                range: prop_spec.range.clone(),
                schema: name.to_string(),
            },
        );
    }

    visiting.pop();
    debug!(schema = name, properties = properties.len(), "resolved schema");

    resolved.insert(
        name.to_string(),
        Schema {
            name: name.to_string(),
            label: spec.label.clone().unwrap_or_else(|| name.to_string()),
            abstract_: spec.abstract_,
            extends: spec.extends.clone(),
            lineage,
            properties,
        },
    );
    Ok(())
}
