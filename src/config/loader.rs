//! Model and mapping loader
//!
//! Path resolution order for the schema model:
//! 1. `FTM_MODEL_PATH` environment variable (explicit override)
//! 2. Relative `config/model.yaml` (works when running from the repo root)
//! 3. The default model compiled into the binary

use anyhow::{Context, Result};
use ftm_types::Model;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::mapping::QueryMapping;

pub const MODEL_PATH_ENV: &str = "FTM_MODEL_PATH";

const DEFAULT_MODEL: &str = include_str!("../../config/model.yaml");

/// Where the schema model comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    File(PathBuf),
    Builtin,
}

pub struct ModelLoader {
    source: ModelSource,
}

impl ModelLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSource::File(path.into()),
        }
    }

    pub fn builtin() -> Self {
        Self {
            source: ModelSource::Builtin,
        }
    }

    pub fn from_env() -> Self {
        if let Ok(path) = std::env::var(MODEL_PATH_ENV) {
            return Self::new(path);
        }

        let local = Path::new("config").join("model.yaml");
        if local.exists() {
            return Self::new(local);
        }

        Self::builtin()
    }

    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    pub fn load(&self) -> Result<Model> {
        match &self.source {
            ModelSource::Builtin => {
                info!("Loading built-in schema model");
                Model::from_yaml_str(DEFAULT_MODEL).context("Failed to parse built-in model")
            }
            ModelSource::File(path) => {
                info!("Loading schema model from {}", path.display());
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Model::from_yaml_str(&content)
                    .with_context(|| format!("Failed to parse {}", path.display()))
            }
        }
    }
}

/// Read a mapping file (YAML or JSON) and build its query mapping
pub fn load_query_mapping(
    path: &Path,
    model: &Model,
    key_prefix: Option<&str>,
) -> Result<QueryMapping> {
    info!("Loading mapping from {}", path.display());
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    QueryMapping::from_yaml_str(model, key_prefix, &content)
        .with_context(|| format!("Invalid mapping in {}", path.display()))
}
