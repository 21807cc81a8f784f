//! Entity proxy
//!
//! A mutable entity instance of one schema. Property values are cleaned on
//! insert, deduplicated, and kept in insertion order.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::schema::{Property, Schema};
use crate::types::PropertyType;

#[derive(Debug, Clone, PartialEq)]
pub struct EntityProxy {
    pub id: Option<String>,
    schema: Arc<Schema>,
    properties: IndexMap<String, Vec<String>>,
}

impl EntityProxy {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            id: None,
            schema,
            properties: IndexMap::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Add values to a property, cleaning each by the property type.
    ///
    /// Blank values and duplicates are dropped.
    pub fn add<I, S>(&mut self, prop: &Property, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for value in values {
            if let Some(cleaned) = prop.type_.clean(value.as_ref()) {
                self.push(&prop.name, cleaned);
            }
        }
    }

    /// Add an already-clean value (e.g. an entity id) without normalization
    pub fn add_cleaned(&mut self, prop: &Property, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.push(&prop.name, value);
        }
    }

    fn push(&mut self, prop: &str, value: String) {
        let values = self.properties.entry(prop.to_string()).or_default();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    /// Values of a property; empty if unset
    pub fn get(&self, prop: &str) -> &[String] {
        self.properties
            .get(prop)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// True if the property holds at least one value
    pub fn has(&self, prop: &str) -> bool {
        !self.get(prop).is_empty()
    }

    /// All values of every country-typed property on this entity
    pub fn countries(&self) -> BTreeSet<String> {
        self.properties
            .iter()
            .filter(|(name, _)| self.schema.get(name).is_some_and(Property::is_country))
            .flat_map(|(_, values)| values.iter().cloned())
            .collect()
    }

    /// Mutable access to every value of the entity-typed properties
    pub fn entity_values_mut(&mut self) -> impl Iterator<Item = &mut String> + '_ {
        let schema = &self.schema;
        self.properties
            .iter_mut()
            .filter(move |(name, _)| {
                schema
                    .get(name)
                    .is_some_and(|prop| prop.type_ == PropertyType::Entity)
            })
            .flat_map(|(_, values)| values.iter_mut())
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::json!({
            "id": self.id,
            "schema": self.schema.name,
            "properties": self.properties,
        })
    }
}

impl Serialize for EntityProxy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("EntityProxy", 3)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("schema", &self.schema.name)?;
        state.serialize_field("properties", &self.properties)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use pretty_assertions::assert_eq;

    fn model() -> Model {
        Model::from_yaml_str(
            r#"
schemata:
  Person:
    properties:
      name: { type: name }
      country: { type: country }
      nationality: { type: country }
      phone: { type: phone }
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_add_cleans_and_dedupes() {
        let model = model();
        let mut proxy = model.make_entity("Person").unwrap();
        let name = proxy.schema().get("name").cloned().unwrap();

        proxy.add(&name, ["  Jane ", "Jane", "", "John"]);

        assert_eq!(proxy.get("name"), ["Jane".to_string(), "John".to_string()]);
        assert!(proxy.has("name"));
        assert!(!proxy.has("phone"));
    }

    #[test]
    fn test_countries_collects_every_country_property() {
        let model = model();
        let mut proxy = model.make_entity("Person").unwrap();
        let country = proxy.schema().get("country").cloned().unwrap();
        let nationality = proxy.schema().get("nationality").cloned().unwrap();
        let phone = proxy.schema().get("phone").cloned().unwrap();

        proxy.add(&country, ["GB"]);
        proxy.add(&nationality, ["fr"]);
        proxy.add(&phone, ["+44 20 7946 0000"]);

        let countries: Vec<String> = proxy.countries().into_iter().collect();
        assert_eq!(countries, vec!["fr".to_string(), "gb".to_string()]);
    }

    #[test]
    fn test_json_shape() {
        let model = model();
        let mut proxy = model.make_entity("Person").unwrap();
        proxy.id = Some("p1".to_string());
        let name = proxy.schema().get("name").cloned().unwrap();
        proxy.add(&name, ["Jane"]);

        let json = serde_json::to_value(&proxy).unwrap();
        assert_eq!(json, proxy.to_json());
        assert_eq!(json["schema"], "Person");
        assert_eq!(json["properties"]["name"][0], "Jane");
    }
}
