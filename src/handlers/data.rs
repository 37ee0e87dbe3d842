//! Record handlers: fetch (list or by key), create, update, delete.
//! Bodies are read as raw bytes and parsed as JSON whatever the content type.

use crate::error::AppError;
use crate::model::Record;
use crate::response::{parse_body, FetchMeta, FetchResponse, RecordResponse};
use crate::service::{compose_key, lookup_in, resolve_entity, ListQuery};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub offset: Option<u64>,
    /// Page size.
    #[serde(default)]
    pub fetch: Option<u64>,
    #[serde(default)]
    pub need_total: bool,
}

/// Key string for the record addressed by `props`, using the container's key attributes.
async fn key_from(state: &AppState, model_id: &str, container: &str, props: &Record) -> Result<String, AppError> {
    let model = state.manager.model(model_id).await?;
    let entity = resolve_entity(&model, container)?;
    compose_key(entity, lookup_in(props))
}

/// POST .../fetch: filtered, paged result set with optional total.
pub async fn fetch(
    State(state): State<AppState>,
    Path((model_id, container)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<FetchResponse>, AppError> {
    let req: FetchRequest = parse_body(&body)?;
    let query = ListQuery {
        filter: req.filter,
        offset: req.offset,
        limit: req.fetch,
    };
    let result_set = state.manager.list(&model_id, &container, &query).await?;
    let total_records = if req.need_total {
        Some(state.manager.count(&model_id, &container, query.filter.as_deref()).await?)
    } else {
        None
    };
    Ok(Json(FetchResponse {
        result_set,
        meta: FetchMeta { total_records },
    }))
}

/// GET .../fetch?<key>=<value>: one record by key, `null` when absent.
pub async fn fetch_record(
    State(state): State<AppState>,
    Path((model_id, container)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<RecordResponse>, AppError> {
    let props: Record = params.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
    let key = key_from(&state, &model_id, &container, &props).await?;
    let record = state.manager.get(&model_id, &container, &key).await?;
    Ok(Json(RecordResponse { record }))
}

pub async fn create(
    State(state): State<AppState>,
    Path((model_id, container)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Record>, AppError> {
    let props: Record = parse_body(&body)?;
    let record = state.manager.create(&model_id, &container, &props).await?;
    Ok(Json(record))
}

/// Body carries the key fields plus the properties to change.
pub async fn update(
    State(state): State<AppState>,
    Path((model_id, container)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Record>, AppError> {
    let props: Record = parse_body(&body)?;
    let key = key_from(&state, &model_id, &container, &props).await?;
    let record = state.manager.update(&model_id, &container, &key, &props).await?;
    Ok(Json(record))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((model_id, container)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let props: Record = parse_body(&body)?;
    let key = key_from(&state, &model_id, &container, &props).await?;
    state.manager.delete(&model_id, &container, &key).await?;
    Ok(Json(Value::Object(Record::new())))
}
