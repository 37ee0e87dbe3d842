//! Config validation: identifiers, uniqueness, mount paths.

use crate::config::{FullConfig, Settings};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*$").expect("identifier pattern compiles"));

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    if config.models.is_empty() {
        return Err(ConfigError::Validation("at least one model required".into()));
    }
    let mut ids = HashSet::new();
    for m in &config.models {
        if !IDENTIFIER.is_match(&m.id) {
            return Err(ConfigError::InvalidIdentifier {
                kind: "model id",
                value: m.id.clone(),
            });
        }
        if !IDENTIFIER.is_match(m.schema_name()) {
            return Err(ConfigError::InvalidIdentifier {
                kind: "schema",
                value: m.schema_name().to_string(),
            });
        }
        if !ids.insert(m.id.as_str()) {
            return Err(ConfigError::DuplicateModel(m.id.clone()));
        }
        let mut entity_ids = HashSet::new();
        for (table, ann) in &m.entities {
            let id = ann.id.as_deref().unwrap_or(table);
            if id.is_empty() || id.contains('/') {
                return Err(ConfigError::InvalidIdentifier {
                    kind: "entity id",
                    value: id.to_string(),
                });
            }
            if ann.enabled && !entity_ids.insert(id) {
                return Err(ConfigError::Validation(format!(
                    "model '{}' maps more than one table to entity id '{}'",
                    m.id, id
                )));
            }
        }
    }
    Ok(())
}

pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    for mount in &settings.mounts {
        if !mount.starts_with('/') || mount.len() < 2 || mount.ends_with('/') {
            return Err(ConfigError::InvalidSetting {
                name: "AUTOCRUD_MOUNTS",
                message: format!("mount path '{}' must start with '/' and not end with '/'", mount),
            });
        }
    }
    if settings.max_connections == 0 {
        return Err(ConfigError::InvalidSetting {
            name: "AUTOCRUD_MAX_CONNECTIONS",
            message: "must be at least 1".into(),
        });
    }
    if !IDENTIFIER.is_match(&settings.default_schema) {
        return Err(ConfigError::InvalidIdentifier {
            kind: "schema",
            value: settings.default_schema.clone(),
        });
    }
    Ok(())
}
