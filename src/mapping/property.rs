//! Property binders
//!
//! A binder populates one schema property of an entity from a record.
//! `EntityMapping` only talks to the `PropertyBinder` trait; `PropertyMapping`
//! is the default binder built from a `PropertySpec`.

use ftm_types::{EntityProxy, Property, PropertyType, Schema};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::config::PropertySpec;
use super::record::Record;
use crate::error::MappingError;

static TEMPLATE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([^}\s]+)\s*\}\}").expect("valid template regex"));

/// Sibling entity mappings visible while binding: mapping name -> schema
#[derive(Debug, Default)]
pub struct BindContext<'a> {
    schemata: BTreeMap<&'a str, &'a Schema>,
}

impl<'a> BindContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mapping: &'a str, schema: &'a Schema) {
        self.schemata.insert(mapping, schema);
    }

    pub fn schema_of(&self, mapping: &str) -> Option<&'a Schema> {
        self.schemata.get(mapping).copied()
    }
}

/// Populates one property of an entity from a record
pub trait PropertyBinder: fmt::Debug + Send + Sync {
    /// The resolved schema property this binder writes
    fn prop(&self) -> &Property;

    /// Columns read from the record
    fn refs(&self) -> &BTreeSet<String>;

    /// Sibling entity mapping this binder takes its value from
    fn entity_dependency(&self) -> Option<&str>;

    /// Drop the entity when this property stays empty
    fn required(&self) -> bool;

    /// Second-pass validation once every sibling mapping exists
    fn bind(&self, ctx: &BindContext<'_>) -> Result<(), MappingError>;

    /// Write values onto the entity. `countries` carries the country values
    /// already present on the entity, for parsers that need that context.
    fn apply(
        &self,
        proxy: &mut EntityProxy,
        record: &Record,
        entities: &BTreeMap<String, EntityProxy>,
        countries: Option<&BTreeSet<String>>,
    );
}

// ============================================================================
// DEFAULT BINDER
// ============================================================================

#[derive(Debug, Clone)]
pub struct PropertyMapping {
    mapping: String,
    prop: Property,
    refs: BTreeSet<String>,
    columns: Vec<String>,
    literals: Vec<String>,
    template: Option<String>,
    join: Option<String>,
    split: Option<String>,
    entity: Option<String>,
    required: bool,
}

impl PropertyMapping {
    /// Build a binder for `prop` as declared by `spec` inside `mapping`
    pub fn new(mapping: &str, spec: &PropertySpec, prop: &Property) -> Result<Self, MappingError> {
        let columns = spec.column_names();
        let literals = spec.literal_values();
        let invalid = |reason: &str| MappingError::InvalidPropertySpec {
            mapping: mapping.to_string(),
            property: prop.name.clone(),
            reason: reason.to_string(),
        };

        if spec.template.is_some() && !columns.is_empty() {
            return Err(invalid("use either template or column(s), not both"));
        }
        if let Some(entity) = &spec.entity {
            if !columns.is_empty() || !literals.is_empty() || spec.template.is_some() {
                return Err(invalid("entity references take no column, literal or template"));
            }
            if prop.type_ != PropertyType::Entity {
                return Err(MappingError::NotAnEntityProperty {
                    mapping: mapping.to_string(),
                    property: prop.name.clone(),
                    entity: entity.clone(),
                });
            }
        }

        let mut refs: BTreeSet<String> = columns.iter().cloned().collect();
        if let Some(template) = &spec.template {
            refs.extend(
                TEMPLATE_PLACEHOLDER
                    .captures_iter(template)
                    .map(|caps| caps[1].to_string()),
            );
        }

        Ok(Self {
            mapping: mapping.to_string(),
            prop: prop.clone(),
            refs,
            columns,
            literals,
            template: spec.template.clone(),
            join: spec.join.clone(),
            split: spec.split.clone(),
            entity: spec.entity.clone(),
            required: spec.required,
        })
    }

    /// Raw values for this property before cleaning
    fn record_values(&self, record: &Record) -> Vec<String> {
        let mut values = match &self.template {
            Some(template) => {
                let mut substituted = false;
                let rendered = TEMPLATE_PLACEHOLDER.replace_all(template, |caps: &Captures| {
                    let value = record.text(&caps[1]);
                    substituted |= value.is_some();
                    value.unwrap_or_default()
                });
                if substituted {
                    vec![rendered.into_owned()]
                } else {
                    Vec::new()
                }
            }
            None => {
                let mut values = self.literals.clone();
                values.extend(self.columns.iter().filter_map(|column| record.text(column)));
                values
            }
        };

        if let Some(join) = &self.join {
            if !values.is_empty() {
                values = vec![values.join(join)];
            }
        }
        if let Some(split) = &self.split {
            values = values
                .iter()
                .flat_map(|value| value.split(split.as_str()))
                .map(str::to_string)
                .collect();
        }
        values
    }
}

impl PropertyBinder for PropertyMapping {
    fn prop(&self) -> &Property {
        &self.prop
    }

    fn refs(&self) -> &BTreeSet<String> {
        &self.refs
    }

    fn entity_dependency(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    fn required(&self) -> bool {
        self.required
    }

    fn bind(&self, ctx: &BindContext<'_>) -> Result<(), MappingError> {
        let Some(entity) = &self.entity else {
            return Ok(());
        };
        let schema = ctx
            .schema_of(entity)
            .ok_or_else(|| MappingError::UnknownEntity {
                mapping: self.mapping.clone(),
                property: self.prop.name.clone(),
                entity: entity.clone(),
            })?;
        if let Some(range) = &self.prop.range {
            if !schema.is_a(range) {
                return Err(MappingError::RangeMismatch {
                    mapping: self.mapping.clone(),
                    property: self.prop.name.clone(),
                    entity: entity.clone(),
                    range: range.clone(),
                    schema: schema.name.clone(),
                });
            }
        }
        Ok(())
    }

    // No type-specific parsing happens here, so country hints go unused.
    fn apply(
        &self,
        proxy: &mut EntityProxy,
        record: &Record,
        entities: &BTreeMap<String, EntityProxy>,
        _countries: Option<&BTreeSet<String>>,
    ) {
        if let Some(entity) = &self.entity {
            if let Some(id) = entities.get(entity).and_then(|other| other.id.as_deref()) {
                proxy.add_cleaned(&self.prop, id);
            }
            return;
        }
        proxy.add(&self.prop, self.record_values(record));
    }
}
