//! Autocrud SDK: generic CRUD REST backend over an introspected PostgreSQL schema.

pub mod case;
pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod registry;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{load_config, FullConfig, ModelConfig, Settings, DEFAULT_MODEL_ID};
pub use error::{AppError, ConfigError};
pub use model::{build_model, introspect, CatalogSnapshot, DataType, Entity, Model, Record};
pub use registry::ModelRegistry;
pub use response::ResultSet;
pub use routes::{app_router, common_routes, data_routes};
pub use service::{DataManager, ListQuery, PgDataManager};
pub use state::AppState;
