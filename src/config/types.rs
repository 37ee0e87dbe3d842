//! Raw config types matching the model configuration JSON file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Model id used when no configuration file names one.
pub const DEFAULT_MODEL_ID: &str = "__default";

/// Database schema introspected when a model omits `schema`.
pub const DEFAULT_SCHEMA: &str = "public";

/// Per-column overrides applied on top of the introspected catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttributeAnnotation {
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Disabled attributes stay in the model but are skipped by free-text filtering.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub read_only: bool,
}

impl Default for AttributeAnnotation {
    fn default() -> Self {
        AttributeAnnotation {
            caption: None,
            description: None,
            enabled: true,
            visible: true,
            read_only: false,
        }
    }
}

/// Per-table overrides. Keyed by table name in [`ModelConfig::entities`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityAnnotation {
    /// Container name exposed over the API; defaults to the table name.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Disabled tables are left out of the model entirely.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeAnnotation>,
}

impl Default for EntityAnnotation {
    fn default() -> Self {
        EntityAnnotation {
            id: None,
            caption: None,
            description: None,
            enabled: true,
            attributes: HashMap::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Database schema to introspect; the loader fills it from settings when omitted.
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub entities: HashMap<String, EntityAnnotation>,
}

impl ModelConfig {
    /// Unannotated model over `schema`.
    pub fn new(id: impl Into<String>, schema: impl Into<String>) -> Self {
        ModelConfig {
            id: id.into(),
            name: None,
            schema: Some(schema.into()),
            entities: HashMap::new(),
        }
    }

    pub fn schema_name(&self) -> &str {
        self.schema.as_deref().unwrap_or(DEFAULT_SCHEMA)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// All configured models.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

impl FullConfig {
    /// Single `__default` model over `schema`, used when no config file is given.
    pub fn with_default_model(schema: &str) -> Self {
        FullConfig {
            models: vec![ModelConfig::new(DEFAULT_MODEL_ID, schema)],
        }
    }

    pub fn model(&self, id: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.id == id)
    }
}

fn default_true() -> bool {
    true
}
