//! Entity mapping: one record in, zero or one entity out
//!
//! An `EntityMapping` is built once per configured entity, validated in full
//! at construction, and then applied to every record. It holds no per-record
//! state, so one instance can serve many threads.
//!
//! # Identity
//!
//! With `id_column`, the id is that column's raw value. Otherwise the id is a
//! SHA-1 over the seed (key prefix + `key_literal`) and the key column values,
//! sorted so the declaration order of key columns does not matter. A record
//! whose key values are all empty leaves the digest unchanged and produces no
//! entity.
//!
//! # Property order
//!
//! Country properties are applied first; every other property then sees the
//! countries already on the entity, for parsers that use them as hints.

use ftm_types::{EntityProxy, Model, Property, Schema};
use sha1::digest::Output;
use sha1::{Digest, Sha1};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, trace};

use super::config::{EntityConfig, PropertySpec};
use super::property::{BindContext, PropertyBinder, PropertyMapping};
use super::record::Record;
use crate::error::MappingError;
use crate::util::key_bytes;

// ============================================================================
// KEY SEED
// ============================================================================

/// Digest pre-loaded with the key prefix and key literal.
///
/// Never updated after construction; `fork` hands out independent copies.
#[derive(Clone)]
pub struct KeyPrefixSeed {
    digest: Sha1,
    fingerprint: Output<Sha1>,
}

impl KeyPrefixSeed {
    pub fn new(key_prefix: Option<&str>, key_literal: Option<&str>) -> Self {
        let mut digest = Sha1::new();
        digest.update(key_bytes(key_prefix));
        digest.update(key_bytes(key_literal));
        let fingerprint = digest.clone().finalize();
        Self {
            digest,
            fingerprint,
        }
    }

    /// A fresh working copy of the seeded digest
    pub fn fork(&self) -> Sha1 {
        self.digest.clone()
    }

    /// Output of the seed itself, with nothing folded in
    pub fn fingerprint(&self) -> &Output<Sha1> {
        &self.fingerprint
    }
}

impl std::fmt::Debug for KeyPrefixSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPrefixSeed({})", hex::encode(&self.fingerprint))
    }
}

// ============================================================================
// OUTCOME
// ============================================================================

/// Why a record produced no entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Every key column was empty, or the id column was missing
    NoKey,
    /// A property marked `required` got no value from this record
    MissingRequired { property: String },
    /// The record did not pass the query filters
    Filtered,
}

/// Result of mapping one record
#[derive(Debug, Clone, PartialEq)]
pub enum MapOutcome {
    Entity(EntityProxy),
    Skipped(SkipReason),
}

impl MapOutcome {
    pub fn into_entity(self) -> Option<EntityProxy> {
        match self {
            MapOutcome::Entity(proxy) => Some(proxy),
            MapOutcome::Skipped(_) => None,
        }
    }

    pub fn entity(&self) -> Option<&EntityProxy> {
        match self {
            MapOutcome::Entity(proxy) => Some(proxy),
            MapOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, MapOutcome::Skipped(_))
    }
}

// ============================================================================
// ENTITY MAPPING
// ============================================================================

#[derive(Debug)]
pub struct EntityMapping {
    name: String,
    schema: Arc<Schema>,
    seed: KeyPrefixSeed,
    keys: Vec<String>,
    id_column: Option<String>,
    refs: BTreeSet<String>,
    dependencies: BTreeSet<String>,
    properties: Vec<Box<dyn PropertyBinder>>,
}

impl EntityMapping {
    /// Build a mapping with the default `PropertyMapping` binders
    pub fn new(
        model: &Model,
        key_prefix: Option<&str>,
        name: &str,
        config: &EntityConfig,
    ) -> Result<Self, MappingError> {
        Self::with_binders(model, key_prefix, name, config, |mapping, spec, prop| {
            Ok(Box::new(PropertyMapping::new(mapping, spec, prop)?) as Box<dyn PropertyBinder>)
        })
    }

    /// Build a mapping, constructing each property binder with `make_binder`
    pub fn with_binders<F>(
        model: &Model,
        key_prefix: Option<&str>,
        name: &str,
        config: &EntityConfig,
        mut make_binder: F,
    ) -> Result<Self, MappingError>
    where
        F: FnMut(&str, &PropertySpec, &Property) -> Result<Box<dyn PropertyBinder>, MappingError>,
    {
        let key_literal = config.key_literal.as_ref().map(|literal| literal.to_text());
        let seed = KeyPrefixSeed::new(key_prefix, key_literal.as_deref());

        let keys = config.key_columns();
        let id_column = config.id_column.clone();
        match (keys.is_empty(), id_column.is_some()) {
            (true, false) => {
                return Err(MappingError::NoKeys {
                    mapping: name.to_string(),
                })
            }
            (false, true) => {
                return Err(MappingError::KeysAndIdColumn {
                    mapping: name.to_string(),
                })
            }
            _ => {}
        }

        let schema_name = config
            .schema
            .as_deref()
            .ok_or_else(|| MappingError::MissingSchema {
                mapping: name.to_string(),
            })?;
        let schema = model
            .get(schema_name)
            .cloned()
            .ok_or_else(|| MappingError::UnknownSchema {
                mapping: name.to_string(),
                schema: schema_name.to_string(),
            })?;

        let mut refs: BTreeSet<String> = keys.iter().cloned().collect();
        refs.extend(id_column.iter().cloned());
        let mut dependencies = BTreeSet::new();
        let mut properties = Vec::with_capacity(config.properties.len());

        for (prop_name, spec) in &config.properties {
            let prop = schema
                .get(prop_name)
                .ok_or_else(|| MappingError::UnknownProperty {
                    mapping: name.to_string(),
                    schema: schema.name.clone(),
                    property: prop_name.clone(),
                })?;
            let binder = make_binder(name, spec, prop)?;
            refs.extend(binder.refs().iter().cloned());
            if let Some(entity) = binder.entity_dependency() {
                dependencies.insert(entity.to_string());
            }
            properties.push(binder);
        }

        debug!(
            mapping = name,
            schema = %schema.name,
            keys = keys.len(),
            properties = properties.len(),
            "built entity mapping"
        );

        Ok(Self {
            name: name.to_string(),
            schema,
            seed,
            keys,
            id_column,
            refs,
            dependencies,
            properties,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Every column this mapping reads
    pub fn refs(&self) -> &BTreeSet<String> {
        &self.refs
    }

    /// Sibling mappings whose entities this mapping references
    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    /// Second validation pass, once every sibling mapping exists
    pub fn bind(&self, ctx: &BindContext<'_>) -> Result<(), MappingError> {
        for binder in &self.properties {
            binder.bind(ctx)?;
        }
        Ok(())
    }

    /// Derive the plain id for a record, or `None` if it has no key material
    pub fn compute_key(&self, record: &Record) -> Option<String> {
        if let Some(id_column) = &self.id_column {
            return record.raw(id_column);
        }

        let mut values: Vec<Vec<u8>> = self
            .keys
            .iter()
            .map(|key| key_bytes(record.raw(key).as_deref()))
            .collect();
        values.sort();

        let mut digest = self.seed.fork();
        for value in &values {
            digest.update(value);
        }
        let output = digest.finalize();
        if &output == self.seed.fingerprint() {
            return None;
        }
        Some(hex::encode(output))
    }

    /// Map one record to an entity of this mapping's schema.
    ///
    /// `entities` holds the entities already produced for this record by
    /// sibling mappings, keyed by mapping name.
    pub fn map(&self, record: &Record, entities: &BTreeMap<String, EntityProxy>) -> MapOutcome {
        let mut proxy = EntityProxy::new(Arc::clone(&self.schema));
        proxy.id = self.compute_key(record);
        if proxy.id.is_none() {
            trace!(mapping = %self.name, "no key material, skipping record");
            return MapOutcome::Skipped(SkipReason::NoKey);
        }

        for binder in self.properties.iter().filter(|b| b.prop().is_country()) {
            binder.apply(&mut proxy, record, entities, None);
        }

        let countries = proxy.countries();
        for binder in self.properties.iter().filter(|b| !b.prop().is_country()) {
            binder.apply(&mut proxy, record, entities, Some(&countries));
        }

        for binder in self.properties.iter().filter(|b| b.required()) {
            if !proxy.has(&binder.prop().name) {
                trace!(
                    mapping = %self.name,
                    property = %binder.prop().name,
                    "required property missing, skipping record"
                );
                return MapOutcome::Skipped(SkipReason::MissingRequired {
                    property: binder.prop().name.clone(),
                });
            }
        }

        MapOutcome::Entity(proxy)
    }
}
