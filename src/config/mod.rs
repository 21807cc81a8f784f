//! Configuration loading
//!
//! Resolves and reads the schema model and mapping files from disk.

pub mod loader;

pub use loader::{load_query_mapping, ModelLoader, ModelSource, MODEL_PATH_ENV};
