//! Source records
//!
//! A record is one row from a spreadsheet, database or API response: column
//! name to scalar value. Values keep their JSON type until read as text.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, JsonValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and literals
    pub fn with(mut self, column: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<JsonValue>) {
        self.0.insert(column.into(), value.into());
    }

    /// The value of a column as text, untrimmed.
    ///
    /// `None` for missing columns and nulls. Nested arrays or objects are
    /// rendered as compact JSON.
    pub fn raw(&self, column: &str) -> Option<String> {
        match self.0.get(column)? {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Bool(b) => Some(b.to_string()),
            JsonValue::Number(n) => Some(n.to_string()),
            other => Some(other.to_string()),
        }
    }

    /// The value of a column as trimmed text; `None` when blank
    pub fn text(&self, column: &str) -> Option<String> {
        self.raw(column)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<JsonValue>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
