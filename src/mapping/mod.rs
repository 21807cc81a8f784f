//! Mapping engine
//!
//! - `config` - serde types for mapping declarations
//! - `record` - source rows
//! - `property` - the `PropertyBinder` seam and the default `PropertyMapping`
//! - `entity` - `EntityMapping`: id derivation and per-record orchestration
//! - `graph` - dependency ordering between entity mappings
//! - `query` - `QueryMapping`: all entity mappings of one configuration

pub mod config;
pub mod entity;
pub mod graph;
pub mod property;
pub mod query;
pub mod record;

pub use config::{EntityConfig, OneOrMany, PropertySpec, QueryConfig, Scalar};
pub use entity::{EntityMapping, KeyPrefixSeed, MapOutcome, SkipReason};
pub use graph::MappingGraph;
pub use property::{BindContext, PropertyBinder, PropertyMapping};
pub use query::QueryMapping;
pub use record::Record;
