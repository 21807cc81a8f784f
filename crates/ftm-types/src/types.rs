//! Property value types

use serde::{Deserialize, Serialize};
use std::fmt;

/// The value type of a schema property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    #[default]
    String,
    Text,
    Name,
    Country,
    Phone,
    Address,
    Email,
    Identifier,
    Url,
    Date,
    /// Reference to another entity by id; the target schema is the property range
    Entity,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Text => "text",
            PropertyType::Name => "name",
            PropertyType::Country => "country",
            PropertyType::Phone => "phone",
            PropertyType::Address => "address",
            PropertyType::Email => "email",
            PropertyType::Identifier => "identifier",
            PropertyType::Url => "url",
            PropertyType::Date => "date",
            PropertyType::Entity => "entity",
        }
    }

    /// Normalize a raw value for storage on an entity.
    ///
    /// Returns `None` for values that carry no data after trimming.
    pub fn clean(&self, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        match self {
            PropertyType::Country => Some(value.to_lowercase()),
            _ => Some(value.to_string()),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
