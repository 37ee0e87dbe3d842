//! Process-wide model cache keyed by model id.
//!
//! Built lazily (or warmed at startup), reused until explicitly invalidated. Readers never hold the lock
//! across an await; two requests racing on a cold entry may both build it and the last insert wins.

use crate::error::AppError;
use crate::model::Model;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Cached model with its build version.
#[derive(Clone, Debug)]
pub struct CachedModel {
    pub model: Arc<Model>,
    /// Registry-wide build counter at the time this entry was stored.
    pub version: u64,
    pub built_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Default)]
pub struct ModelRegistry {
    entries: RwLock<HashMap<String, CachedModel>>,
    builds: AtomicU64,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry, if present.
    pub fn get(&self, model_id: &str) -> Option<CachedModel> {
        self.entries
            .read()
            .ok()
            .and_then(|guard| guard.get(model_id).cloned())
    }

    /// Store a freshly built model and return its entry.
    pub fn insert(&self, model: Model) -> CachedModel {
        let entry = CachedModel {
            model: Arc::new(model),
            version: self.builds.fetch_add(1, Ordering::SeqCst) + 1,
            built_at: chrono::Utc::now(),
        };
        match self.entries.write() {
            Ok(mut guard) => {
                guard.insert(entry.model.id.clone(), entry.clone());
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(entry.model.id.clone(), entry.clone());
            }
        }
        entry
    }

    /// Cached model, or build it with `build` and cache the result.
    pub async fn get_or_build<F, Fut>(&self, model_id: &str, build: F) -> Result<Arc<Model>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Model, AppError>>,
    {
        if let Some(entry) = self.get(model_id) {
            return Ok(entry.model);
        }
        let model = build().await?;
        Ok(self.insert(model).model)
    }

    /// Drop one cached model; the next request rebuilds it.
    pub fn invalidate(&self, model_id: &str) -> bool {
        let removed = match self.entries.write() {
            Ok(mut guard) => guard.remove(model_id).is_some(),
            Err(poisoned) => poisoned.into_inner().remove(model_id).is_some(),
        };
        if removed {
            tracing::info!(model = %model_id, "model invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        match self.entries.write() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    /// Number of models built since the registry was created.
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn cached_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .read()
            .map(|guard| guard.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}
