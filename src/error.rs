//! Configuration errors for entity mappings
//!
//! These are raised while a mapping is being built or bound, never while
//! records are mapped. A record that yields no entity is a `MapOutcome`, not
//! an error.

use ftm_types::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("No keys or ID: {mapping}")]
    NoKeys { mapping: String },

    #[error("Please use only keys or id_column, not both: {mapping}")]
    KeysAndIdColumn { mapping: String },

    #[error("Mapping '{mapping}' has no schema")]
    MissingSchema { mapping: String },

    #[error("Invalid schema '{schema}' in mapping '{mapping}'")]
    UnknownSchema { mapping: String, schema: String },

    #[error("Invalid property '{property}' for schema '{schema}' in mapping '{mapping}'")]
    UnknownProperty {
        mapping: String,
        schema: String,
        property: String,
    },

    #[error("Invalid spec for property '{property}' in mapping '{mapping}': {reason}")]
    InvalidPropertySpec {
        mapping: String,
        property: String,
        reason: String,
    },

    #[error("No entity '{entity}' for property '{property}' in mapping '{mapping}'")]
    UnknownEntity {
        mapping: String,
        property: String,
        entity: String,
    },

    #[error(
        "Entity '{entity}' referenced by '{property}' in mapping '{mapping}' must be a {range} (not {schema})"
    )]
    RangeMismatch {
        mapping: String,
        property: String,
        entity: String,
        range: String,
        schema: String,
    },

    #[error("Property '{property}' in mapping '{mapping}' references entity '{entity}' but is not an entity property")]
    NotAnEntityProperty {
        mapping: String,
        property: String,
        entity: String,
    },

    #[error("Circular dependency between mappings: {}", mappings.join(" -> "))]
    DependencyCycle { mappings: Vec<String> },

    #[error("Query has no entities")]
    NoEntities,

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Failed to parse mapping: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl MappingError {
    /// Name of the mapping the error was raised for, if any
    pub fn mapping(&self) -> Option<&str> {
        match self {
            MappingError::NoKeys { mapping }
            | MappingError::KeysAndIdColumn { mapping }
            | MappingError::MissingSchema { mapping }
            | MappingError::UnknownSchema { mapping, .. }
            | MappingError::UnknownProperty { mapping, .. }
            | MappingError::InvalidPropertySpec { mapping, .. }
            | MappingError::UnknownEntity { mapping, .. }
            | MappingError::RangeMismatch { mapping, .. }
            | MappingError::NotAnEntityProperty { mapping, .. } => Some(mapping),
            _ => None,
        }
    }
}
