//! Load model configuration from a JSON file or fall back to the default model.

use crate::config::{validate, FullConfig, Settings};
use crate::error::ConfigError;
use std::path::Path;

/// Parse a configuration document and fill omitted schemas with `default_schema`.
pub fn parse_config(json: &str, default_schema: &str) -> Result<FullConfig, ConfigError> {
    let mut config: FullConfig = serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
    for model in &mut config.models {
        if model.schema.is_none() {
            model.schema = Some(default_schema.to_string());
        }
    }
    validate(&config)?;
    Ok(config)
}

/// Read a configuration file from disk.
pub async fn load_from_path(path: &Path, default_schema: &str) -> Result<FullConfig, ConfigError> {
    tracing::debug!(path = %path.display(), "loading model config");
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_config(&raw, default_schema)
}

/// Configuration named by settings, or the single default model when no path is set.
pub async fn load_config(settings: &Settings) -> Result<FullConfig, ConfigError> {
    match &settings.config_path {
        Some(path) => load_from_path(path, &settings.default_schema).await,
        None => {
            let config = FullConfig::with_default_model(&settings.default_schema);
            validate(&config)?;
            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "models": [
            {
                "id": "__default",
                "name": "Northwind",
                "entities": {
                    "categories": {
                        "id": "Category",
                        "attributes": {
                            "picture": { "enabled": false },
                            "description": { "caption": "Notes", "read_only": true }
                        }
                    },
                    "audit_log": { "enabled": false }
                }
            },
            { "id": "archive", "schema": "archive" }
        ]
    }"#;

    #[test]
    fn omitted_schema_uses_default() {
        let config = parse_config(SAMPLE, "northwind").unwrap();
        assert_eq!(config.model("__default").unwrap().schema_name(), "northwind");
        assert_eq!(config.model("archive").unwrap().schema_name(), "archive");
    }

    #[test]
    fn annotations_parse_with_defaults() {
        let config = parse_config(SAMPLE, "public").unwrap();
        let model = config.model("__default").unwrap();
        assert_eq!(model.display_name(), "Northwind");
        let categories = &model.entities["categories"];
        assert_eq!(categories.id.as_deref(), Some("Category"));
        assert!(categories.enabled);
        let picture = &categories.attributes["picture"];
        assert!(!picture.enabled);
        assert!(picture.visible);
        assert!(!picture.read_only);
        let description = &categories.attributes["description"];
        assert_eq!(description.caption.as_deref(), Some("Notes"));
        assert!(description.read_only);
        assert!(!model.entities["audit_log"].enabled);
    }

    #[test]
    fn malformed_json_is_a_load_error() {
        assert!(matches!(parse_config("{ models: ", "public"), Err(ConfigError::Load(_))));
    }

    #[tokio::test]
    async fn missing_file_is_a_load_error() {
        let err = load_from_path(Path::new("/nonexistent/autocrud.json"), "public")
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Load(msg) if msg.contains("/nonexistent/autocrud.json")));
    }
}
