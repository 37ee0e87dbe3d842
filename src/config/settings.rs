//! Process settings read from the environment.

use crate::config::DEFAULT_SCHEMA;
use crate::error::ConfigError;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_MOUNT: &str = "/api/data";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    /// Every prefix the data routes are nested under (e.g. `/api/easydata`, `/api/data`).
    pub mounts: Vec<String>,
    pub max_connections: u32,
    pub body_limit: usize,
    pub default_schema: String,
    /// Optional JSON model configuration; without it a single `__default` model is served.
    pub config_path: Option<PathBuf>,
}

impl Settings {
    /// Read settings from process environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary lookup (environment, map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSetting("DATABASE_URL"))?;
        let bind_addr = lookup("AUTOCRUD_BIND").unwrap_or_else(|| DEFAULT_BIND.into());
        let mounts = lookup("AUTOCRUD_MOUNTS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_MOUNT.to_string()]);
        let max_connections = parse_number(&lookup, "AUTOCRUD_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let body_limit = parse_number(&lookup, "AUTOCRUD_BODY_LIMIT", DEFAULT_BODY_LIMIT)?;
        let default_schema = lookup("AUTOCRUD_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.into());
        let config_path = lookup("AUTOCRUD_CONFIG_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let settings = Settings {
            database_url,
            bind_addr,
            mounts,
            max_connections,
            body_limit,
            default_schema,
            config_path,
        };
        crate::config::validate_settings(&settings)?;
        Ok(settings)
    }
}

fn parse_number<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidSetting {
            name,
            message: e.to_string(),
        }),
    }
}
