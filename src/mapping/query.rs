//! Query mapping: several entity mappings over the same records
//!
//! Construction builds every `EntityMapping`, binds them against each other,
//! and orders them so referenced entities are produced before the mappings
//! that point at them. Each record then yields at most one entity per mapping.

use ftm_types::{EntityProxy, Model};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, trace};

use super::config::{OneOrMany, QueryConfig, Scalar};
use super::entity::{EntityMapping, MapOutcome, SkipReason};
use super::graph::MappingGraph;
use super::property::BindContext;
use super::record::Record;
use crate::error::MappingError;

#[derive(Debug)]
pub struct QueryMapping {
    /// Entity mappings in dependency order
    mappings: Vec<EntityMapping>,
    filters: Vec<(String, BTreeSet<String>)>,
    filters_not: Vec<(String, BTreeSet<String>)>,
    refs: BTreeSet<String>,
}

fn filter_values(filters: &indexmap::IndexMap<String, OneOrMany<Scalar>>) -> Vec<(String, BTreeSet<String>)> {
    filters
        .iter()
        .map(|(column, values)| (column.clone(), values.iter().map(Scalar::to_text).collect()))
        .collect()
}

impl QueryMapping {
    pub fn new(
        model: &Model,
        key_prefix: Option<&str>,
        config: &QueryConfig,
    ) -> Result<Self, MappingError> {
        if config.entities.is_empty() {
            return Err(MappingError::NoEntities);
        }

        let mut mappings = Vec::with_capacity(config.entities.len());
        for (name, entity_config) in &config.entities {
            mappings.push(EntityMapping::new(model, key_prefix, name, entity_config)?);
        }

        {
            let mut ctx = BindContext::new();
            for mapping in &mappings {
                ctx.insert(mapping.name(), mapping.schema());
            }
            for mapping in &mappings {
                mapping.bind(&ctx)?;
            }
        }

        let graph = MappingGraph::new(
            mappings
                .iter()
                .map(|mapping| (mapping.name(), mapping.dependencies().iter())),
        );
        let order = graph.topological_order()?;

        let mut by_name: HashMap<String, EntityMapping> = mappings
            .into_iter()
            .map(|mapping| (mapping.name().to_string(), mapping))
            .collect();
        let mappings: Vec<EntityMapping> = order
            .iter()
            .filter_map(|name| by_name.remove(name))
            .collect();

        let mut filters = filter_values(&config.filters);
        let filters_not = filter_values(&config.filters_not);

        let mut refs: BTreeSet<String> = mappings
            .iter()
            .flat_map(|mapping| mapping.refs().iter().cloned())
            .collect();
        refs.extend(filters.iter().map(|(column, _)| column.clone()));
        refs.extend(filters_not.iter().map(|(column, _)| column.clone()));

        // An empty allow-list would reject every record
        filters.retain(|(_, values)| !values.is_empty());

        debug!(order = ?order, refs = refs.len(), "built query mapping");

        Ok(Self {
            mappings,
            filters,
            filters_not,
            refs,
        })
    }

    pub fn from_yaml_str(
        model: &Model,
        key_prefix: Option<&str>,
        yaml: &str,
    ) -> Result<Self, MappingError> {
        Self::new(model, key_prefix, &QueryConfig::from_yaml_str(yaml)?)
    }

    /// Entity mappings in the order they are applied
    pub fn mappings(&self) -> &[EntityMapping] {
        &self.mappings
    }

    pub fn get(&self, name: &str) -> Option<&EntityMapping> {
        self.mappings.iter().find(|mapping| mapping.name() == name)
    }

    /// Every column read by any mapping or filter
    pub fn refs(&self) -> &BTreeSet<String> {
        &self.refs
    }

    /// True if the record passes `filters` and `filters_not`
    pub fn passes(&self, record: &Record) -> bool {
        let allowed = self.filters.iter().all(|(column, values)| {
            record
                .text(column)
                .is_some_and(|value| values.contains(&value))
        });
        let denied = self.filters_not.iter().any(|(column, values)| {
            record
                .text(column)
                .is_some_and(|value| values.contains(&value))
        });
        allowed && !denied
    }

    /// Outcome of every mapping for one record, in application order
    pub fn map_outcomes(&self, record: &Record) -> Vec<(&str, MapOutcome)> {
        if !self.passes(record) {
            trace!("record rejected by query filters");
            return self
                .mappings
                .iter()
                .map(|mapping| (mapping.name(), MapOutcome::Skipped(SkipReason::Filtered)))
                .collect();
        }

        let mut entities: BTreeMap<String, EntityProxy> = BTreeMap::new();
        let mut outcomes = Vec::with_capacity(self.mappings.len());
        for mapping in &self.mappings {
            let outcome = mapping.map(record, &entities);
            if let Some(proxy) = outcome.entity() {
                entities.insert(mapping.name().to_string(), proxy.clone());
            }
            outcomes.push((mapping.name(), outcome));
        }
        outcomes
    }

    /// Entities produced for one record, keyed by mapping name
    pub fn map(&self, record: &Record) -> BTreeMap<String, EntityProxy> {
        self.map_outcomes(record)
            .into_iter()
            .filter_map(|(name, outcome)| outcome.into_entity().map(|proxy| (name.to_string(), proxy)))
            .collect()
    }
}
