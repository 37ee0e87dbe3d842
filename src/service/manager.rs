//! The data manager seam between HTTP handlers and the store.

use crate::error::AppError;
use crate::model::{Entity, Model, Record};
use crate::response::ResultSet;
use async_trait::async_trait;
use std::sync::Arc;

/// Paging and filtering for [`DataManager::list`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Free-text filter; blank means none.
    pub filter: Option<String>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

/// Generic record operations addressed by model id and container name.
///
/// Key strings are the record's primary-key values joined with `:` in key-declaration order.
#[async_trait]
pub trait DataManager: Send + Sync {
    /// Model for `model_id`, built on first use and cached.
    async fn model(&self, model_id: &str) -> Result<Arc<Model>, AppError>;

    /// Drop the cached model and build it again.
    async fn refresh_model(&self, model_id: &str) -> Result<Arc<Model>, AppError>;

    async fn list(&self, model_id: &str, container: &str, query: &ListQuery) -> Result<ResultSet, AppError>;

    /// Number of records `list` would return for the same filter without paging.
    async fn count(&self, model_id: &str, container: &str, filter: Option<&str>) -> Result<u64, AppError>;

    /// Record by key; `None` when absent.
    async fn get(&self, model_id: &str, container: &str, key: &str) -> Result<Option<Record>, AppError>;

    async fn create(&self, model_id: &str, container: &str, props: &Record) -> Result<Record, AppError>;

    async fn update(&self, model_id: &str, container: &str, key: &str, props: &Record) -> Result<Record, AppError>;

    async fn delete(&self, model_id: &str, container: &str, key: &str) -> Result<(), AppError>;

    /// Store readiness.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Entity for a container name within a model.
pub fn resolve_entity<'m>(model: &'m Model, container: &str) -> Result<&'m Entity, AppError> {
    model
        .entity(container)
        .ok_or_else(|| AppError::ContainerNotFound(container.to_string()))
}

pub fn entity_not_found(entity: &Entity, key: &str) -> AppError {
    AppError::EntityNotFound {
        container: entity.id.clone(),
        key: key.to_string(),
    }
}
