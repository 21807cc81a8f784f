//! ftm-mapping: tabular records to graph entities
//!
//! Two subsystems that compose through the plain/signed identifier contract:
//!
//! - `mapping` - turns one source record plus a declarative mapping into
//!   zero-or-one entity per mapping, with a deterministic content-derived id
//! - `namespace` - partitions plain ids per dataset with an HMAC signature
//!   suffix, and verifies signed ids in constant time
//!
//! Mapping produces plain ids; a caller applies `Namespace::sign` downstream.
//!
//! The schema model lives in the `ftm-types` crate and is re-exported here.

pub mod config;
pub mod error;
pub mod mapping;
pub mod namespace;
pub mod util;

pub use error::MappingError;
pub use mapping::{
    EntityConfig, EntityMapping, KeyPrefixSeed, MapOutcome, PropertyBinder, PropertyMapping,
    PropertySpec, QueryConfig, QueryMapping, Record, SkipReason,
};
pub use namespace::{Namespace, SEP};

pub use ftm_types::{EntityProxy, Model, ModelError, Property, PropertyType, Schema};
