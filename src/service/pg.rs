//! PostgreSQL-backed [`DataManager`].

use crate::config::FullConfig;
use crate::error::AppError;
use crate::model::{introspect, Attribute, DataType, Entity, Model, Record};
use crate::registry::ModelRegistry;
use crate::response::ResultSet;
use crate::service::keys::parse_key;
use crate::service::manager::{entity_not_found, resolve_entity, DataManager, ListQuery};
use crate::service::mapping::{map_properties, WriteMode};
use crate::sql::{self, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use std::fmt::Write as _;
use std::sync::Arc;

pub struct PgDataManager {
    pool: PgPool,
    config: FullConfig,
    registry: ModelRegistry,
}

impl PgDataManager {
    pub fn new(pool: PgPool, config: FullConfig) -> Self {
        PgDataManager {
            pool,
            config,
            registry: ModelRegistry::new(),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Build every configured model up front so the first request does not pay for introspection.
    pub async fn warm_up(&self) -> Result<(), AppError> {
        for m in &self.config.models {
            self.model(&m.id).await?;
        }
        Ok(())
    }

    async fn build(&self, model_id: &str) -> Result<Model, AppError> {
        let cfg = self
            .config
            .model(model_id)
            .ok_or_else(|| AppError::ModelNotFound(model_id.to_string()))?;
        introspect(&self.pool, cfg).await
    }

    async fn fetch_optional(&self, entity: &Entity, q: &QueryBuf) -> Result<Option<Record>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), q).fetch_optional(&self.pool).await?;
        row.map(|r| decode_record(entity, &r)).transpose()
    }

    async fn fetch_one(&self, entity: &Entity, q: &QueryBuf) -> Result<Record, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), q).fetch_one(&self.pool).await?;
        decode_record(entity, &row)
    }
}

fn bind_all<'q>(mut query: Query<'q, Postgres, PgArguments>, q: &QueryBuf) -> Query<'q, Postgres, PgArguments> {
    for p in &q.params {
        query = query.bind(p.clone());
    }
    query
}

#[async_trait]
impl DataManager for PgDataManager {
    async fn model(&self, model_id: &str) -> Result<Arc<Model>, AppError> {
        self.registry.get_or_build(model_id, || self.build(model_id)).await
    }

    async fn refresh_model(&self, model_id: &str) -> Result<Arc<Model>, AppError> {
        if self.config.model(model_id).is_none() {
            return Err(AppError::ModelNotFound(model_id.to_string()));
        }
        self.registry.invalidate(model_id);
        self.model(model_id).await
    }

    async fn list(&self, model_id: &str, container: &str, query: &ListQuery) -> Result<ResultSet, AppError> {
        let model = self.model(model_id).await?;
        let entity = resolve_entity(&model, container)?;
        let q = sql::select_list(entity, &model.schema, query.filter.as_deref(), query.offset, query.limit);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q).fetch_all(&self.pool).await?;
        let mut rs = ResultSet::for_entity(entity);
        rs.rows.reserve(rows.len());
        for row in &rows {
            rs.rows.push(decode_row(entity, row)?);
        }
        Ok(rs)
    }

    async fn count(&self, model_id: &str, container: &str, filter: Option<&str>) -> Result<u64, AppError> {
        let model = self.model(model_id).await?;
        let entity = resolve_entity(&model, container)?;
        let q = sql::count(entity, &model.schema, filter);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let n: i64 = bind_all(sqlx::query(&q.sql), &q)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    async fn get(&self, model_id: &str, container: &str, key: &str) -> Result<Option<Record>, AppError> {
        let model = self.model(model_id).await?;
        let entity = resolve_entity(&model, container)?;
        let values = parse_key(entity, key)?;
        let q = sql::select_by_key(entity, &model.schema, values);
        self.fetch_optional(entity, &q).await
    }

    async fn create(&self, model_id: &str, container: &str, props: &Record) -> Result<Record, AppError> {
        let model = self.model(model_id).await?;
        let entity = resolve_entity(&model, container)?;
        let fields = map_properties(entity, props, WriteMode::Insert)?;
        let q = sql::insert(entity, &model.schema, fields);
        self.fetch_one(entity, &q).await
    }

    async fn update(&self, model_id: &str, container: &str, key: &str, props: &Record) -> Result<Record, AppError> {
        let model = self.model(model_id).await?;
        let entity = resolve_entity(&model, container)?;
        let values = parse_key(entity, key)?;
        let fields = map_properties(entity, props, WriteMode::Update)?;
        let q = sql::update(entity, &model.schema, values, fields);
        self.fetch_optional(entity, &q)
            .await?
            .ok_or_else(|| entity_not_found(entity, key))
    }

    async fn delete(&self, model_id: &str, container: &str, key: &str) -> Result<(), AppError> {
        let model = self.model(model_id).await?;
        let entity = resolve_entity(&model, container)?;
        let values = parse_key(entity, key)?;
        let q = sql::delete(entity, &model.schema, values);
        match self.fetch_optional(entity, &q).await? {
            Some(_) => Ok(()),
            None => Err(entity_not_found(entity, key)),
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

fn decode_record(entity: &Entity, row: &PgRow) -> Result<Record, AppError> {
    Ok(entity.record_from_row(decode_row(entity, row)?))
}

fn decode_row(entity: &Entity, row: &PgRow) -> Result<Vec<Value>, AppError> {
    entity
        .attributes
        .iter()
        .enumerate()
        .map(|(i, a)| cell_to_value(row, i, a).map_err(AppError::from))
        .collect()
}

fn opt<T>(v: Option<T>, f: impl FnOnce(T) -> Value) -> Value {
    v.map(f).unwrap_or(Value::Null)
}

fn float_value(f: f64) -> Value {
    serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Decode column `i` according to the attribute's type tag (the SELECT list is in attribute order).
fn cell_to_value(row: &PgRow, i: usize, attr: &Attribute) -> Result<Value, sqlx::Error> {
    Ok(match attr.data_type {
        DataType::Int32 if attr.sql_type == "int2" => opt(row.try_get::<Option<i16>, _>(i)?, |n| n.into()),
        DataType::Int32 => opt(row.try_get::<Option<i32>, _>(i)?, |n| n.into()),
        DataType::Int64 => opt(row.try_get::<Option<i64>, _>(i)?, |n| n.into()),
        DataType::Bool => opt(row.try_get::<Option<bool>, _>(i)?, Value::Bool),
        DataType::Float if attr.sql_type == "float4" => {
            opt(row.try_get::<Option<f32>, _>(i)?, |n| float_value(f64::from(n)))
        }
        DataType::Float => opt(row.try_get::<Option<f64>, _>(i)?, float_value),
        DataType::Currency => opt(row.try_get::<Option<String>, _>(i)?, |s| {
            match s.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                Some(n) => Value::Number(n),
                None => Value::String(s),
            }
        }),
        DataType::Date => opt(row.try_get::<Option<chrono::NaiveDate>, _>(i)?, |d| {
            Value::String(d.format("%Y-%m-%d").to_string())
        }),
        DataType::Time if attr.is_tz_aware() => opt(row.try_get::<Option<String>, _>(i)?, Value::String),
        DataType::Time => opt(row.try_get::<Option<chrono::NaiveTime>, _>(i)?, |t| {
            Value::String(t.format("%H:%M:%S%.f").to_string())
        }),
        DataType::DateTime if attr.is_tz_aware() => {
            opt(row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(i)?, |d| {
                Value::String(d.to_rfc3339())
            })
        }
        DataType::DateTime => opt(row.try_get::<Option<chrono::NaiveDateTime>, _>(i)?, |d| {
            Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }),
        DataType::Guid => opt(row.try_get::<Option<uuid::Uuid>, _>(i)?, |u| Value::String(u.to_string())),
        DataType::Blob => opt(row.try_get::<Option<Vec<u8>>, _>(i)?, |b| Value::String(bytea_hex(&b))),
        DataType::Json => opt(row.try_get::<Option<Value>, _>(i)?, |v| v),
        DataType::String | DataType::Unknown => opt(row.try_get::<Option<String>, _>(i)?, Value::String),
    })
}

/// PostgreSQL hex form, e.g. `\xdeadbeef`.
pub(crate) fn bytea_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}
