//! Schema Model Types for ftm-mapping
//!
//! This crate is the schema/model collaborator consumed by the mapping engine.
//! It knows nothing about mappings, records or namespaces.
//!
//! ## Contents
//!
//! - `PropertyType` - the value type of a property (country, phone, entity, ...)
//! - `Schema` / `Property` - resolved schema definitions with inheritance flattened
//! - `Model` - registry of schemata, loaded from YAML
//! - `EntityProxy` - a mutable, id-settable entity instance of one schema
//!
//! ## Rules
//!
//! 1. Schemata are immutable once the model is built - they are shared via `Arc`
//! 2. Value cleaning is minimal (trim, drop empty, lowercase countries);
//!    type-specific parsing belongs elsewhere
//! 3. Property values are multi-valued and keep insertion order

pub mod model;
pub mod proxy;
pub mod schema;
pub mod types;

pub use model::{Model, ModelError};
pub use proxy::EntityProxy;
pub use schema::{Property, Schema};
pub use types::PropertyType;
