//! In-memory `DataManager` over a Northwind-shaped model, for driving the router without a database.
#![allow(dead_code)]

use async_trait::async_trait;
use autocrud_sdk::model::introspect::{ColumnRow, ForeignKeyRow, KeyRow, TableRow};
use autocrud_sdk::service::{
    compose_key, entity_not_found, lookup_in, map_properties, parse_key, resolve_entity, WriteMode,
};
use autocrud_sdk::sql::normalize_filter;
use autocrud_sdk::{
    app_router, build_model, AppError, AppState, CatalogSnapshot, DataManager, Entity, ListQuery, Model,
    ModelConfig, Record, ResultSet, DEFAULT_MODEL_ID,
};
use axum::Router;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

pub const MOUNTS: [&str; 2] = ["/api/easydata", "/api/data"];

fn column(table: &str, name: &str, pos: i32, udt: &str, nullable: bool) -> ColumnRow {
    ColumnRow {
        table_name: table.into(),
        column_name: name.into(),
        ordinal_position: pos,
        udt_schema: "pg_catalog".into(),
        udt_name: udt.into(),
        is_nullable: nullable,
        has_default: false,
        is_generated: false,
        max_length: if udt == "varchar" { Some(40) } else { None },
        description: None,
    }
}

fn key(table: &str, name: &str, position: i32) -> KeyRow {
    KeyRow {
        table_name: table.into(),
        column_name: name.into(),
        position,
    }
}

/// Eight tables; `Category.Id` and `Product.Id` are serial, `Customer.Id` is a 5-letter code.
pub fn northwind_catalog() -> CatalogSnapshot {
    let tables = [
        "Category", "Customer", "Employee", "Order", "OrderDetail", "Product", "Shipper", "Supplier",
    ];
    let mut columns = vec![
        column("Category", "Id", 1, "int4", false),
        column("Category", "CategoryName", 2, "varchar", false),
        column("Category", "Description", 3, "text", true),
        column("Customer", "Id", 1, "bpchar", false),
        column("Customer", "CompanyName", 2, "varchar", false),
        column("Customer", "Country", 3, "varchar", true),
        column("Employee", "Id", 1, "int4", false),
        column("Employee", "LastName", 2, "varchar", false),
        column("Employee", "FirstName", 3, "varchar", false),
        column("Order", "Id", 1, "int4", false),
        column("Order", "CustomerId", 2, "bpchar", true),
        column("Order", "OrderDate", 3, "timestamp", true),
        column("OrderDetail", "OrderId", 1, "int4", false),
        column("OrderDetail", "ProductId", 2, "int4", false),
        column("OrderDetail", "Quantity", 3, "int2", false),
        column("Product", "Id", 1, "int4", false),
        column("Product", "ProductName", 2, "varchar", false),
        column("Product", "CategoryId", 3, "int4", true),
        column("Product", "UnitPrice", 4, "numeric", true),
        column("Product", "Discontinued", 5, "bool", true),
        column("Shipper", "Id", 1, "int4", false),
        column("Shipper", "CompanyName", 2, "varchar", false),
        column("Supplier", "Id", 1, "int4", false),
        column("Supplier", "CompanyName", 2, "varchar", false),
    ];
    for c in &mut columns {
        if c.column_name == "Id" && c.udt_name == "int4" {
            c.has_default = true;
        }
    }
    CatalogSnapshot {
        tables: tables
            .iter()
            .map(|t| TableRow {
                table_name: t.to_string(),
                description: None,
            })
            .collect(),
        columns,
        primary_keys: vec![
            key("Category", "Id", 1),
            key("Customer", "Id", 1),
            key("Employee", "Id", 1),
            key("Order", "Id", 1),
            key("OrderDetail", "OrderId", 1),
            key("OrderDetail", "ProductId", 2),
            key("Product", "Id", 1),
            key("Shipper", "Id", 1),
            key("Supplier", "Id", 1),
        ],
        foreign_keys: vec![ForeignKeyRow {
            constraint_name: "fk_product_category".into(),
            table_name: "Product".into(),
            column_name: "CategoryId".into(),
            foreign_table: "Category".into(),
            foreign_column: "Id".into(),
        }],
    }
}

/// Column count per table in [`northwind_catalog`].
pub fn column_counts() -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for c in northwind_catalog().columns {
        *counts.entry(c.table_name).or_insert(0) += 1;
    }
    counts
}

pub struct MemoryDataManager {
    model: Arc<Model>,
    tables: Mutex<HashMap<String, Vec<Record>>>,
    next_id: AtomicU64,
}

fn rec(v: Value) -> Record {
    v.as_object().cloned().unwrap_or_default()
}

impl MemoryDataManager {
    pub fn new() -> Self {
        let config = ModelConfig::new(DEFAULT_MODEL_ID, "public");
        let model = build_model(&config, &northwind_catalog()).expect("fixture model builds");
        MemoryDataManager {
            model: Arc::new(model),
            tables: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(100),
        }
    }

    /// Sample rows for Category, Customer, Product and OrderDetail.
    pub fn seeded() -> Self {
        let m = Self::new();
        {
            let mut t = m.tables.lock().unwrap();
            t.insert(
                "Category".into(),
                vec![
                    rec(json!({ "Id": 1, "CategoryName": "Beverages", "Description": "Soft drinks, coffees, teas" })),
                    rec(json!({ "Id": 2, "CategoryName": "Condiments", "Description": "Sweet and savory sauces" })),
                    rec(json!({ "Id": 3, "CategoryName": "Confections", "Description": "Desserts and candies" })),
                    rec(json!({ "Id": 8, "CategoryName": "Seafood", "Description": "Seaweed and fish" })),
                ],
            );
            t.insert(
                "Customer".into(),
                vec![
                    rec(json!({ "Id": "ALFKI", "CompanyName": "Alfreds Futterkiste", "Country": "Germany" })),
                    rec(json!({ "Id": "ANATR", "CompanyName": "Ana Trujillo Emparedados", "Country": "Mexico" })),
                ],
            );
            t.insert(
                "Product".into(),
                vec![
                    rec(json!({ "Id": 1, "ProductName": "Chai", "CategoryId": 1, "UnitPrice": 18, "Discontinued": false })),
                    rec(json!({ "Id": 10, "ProductName": "Ikura", "CategoryId": 8, "UnitPrice": 31, "Discontinued": false })),
                ],
            );
            t.insert(
                "OrderDetail".into(),
                vec![
                    rec(json!({ "OrderId": 10248, "ProductId": 11, "Quantity": 12 })),
                    rec(json!({ "OrderId": 10248, "ProductId": 42, "Quantity": 10 })),
                ],
            );
        }
        m
    }

    fn entity(&self, model_id: &str, container: &str) -> Result<&Entity, AppError> {
        if model_id != self.model.id {
            return Err(AppError::ModelNotFound(model_id.to_string()));
        }
        resolve_entity(&self.model, container)
    }

    fn matching(&self, entity: &Entity, filter: Option<&str>) -> Vec<Record> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Record> = tables.get(&entity.id).cloned().unwrap_or_default();
        if let Some(text) = normalize_filter(filter) {
            let needle = text.to_lowercase();
            rows.retain(|r| {
                entity.searchable_attributes().any(|a| {
                    r.get(&a.prop_name)
                        .map(|v| text_of(v).to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
            });
        }
        rows.sort_by(|a, b| {
            entity
                .key_attributes()
                .map(|k| compare(a.get(&k.prop_name), b.get(&k.prop_name)))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        rows
    }

    fn position(&self, entity: &Entity, rows: &[Record], key: &str) -> Result<Option<usize>, AppError> {
        let wanted = parse_key(entity, key)?;
        Ok(rows.iter().position(|r| {
            entity
                .key_attributes()
                .zip(&wanted)
                .all(|(a, w)| r.get(&a.prop_name).and_then(|v| a.convert_json(v).ok()).as_ref() == Some(w))
        }))
    }
}

impl Default for MemoryDataManager {
    fn default() -> Self {
        Self::new()
    }
}

fn text_of(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => text_of(x).cmp(&text_of(y)),
        _ => Ordering::Equal,
    }
}

/// Record in attribute order with every attribute present.
fn normalized(entity: &Entity, r: &Record) -> Record {
    entity
        .attributes
        .iter()
        .map(|a| (a.prop_name.clone(), r.get(&a.prop_name).cloned().unwrap_or(Value::Null)))
        .collect()
}

#[async_trait]
impl DataManager for MemoryDataManager {
    async fn model(&self, model_id: &str) -> Result<Arc<Model>, AppError> {
        if model_id != self.model.id {
            return Err(AppError::ModelNotFound(model_id.to_string()));
        }
        Ok(self.model.clone())
    }

    async fn refresh_model(&self, model_id: &str) -> Result<Arc<Model>, AppError> {
        self.model(model_id).await
    }

    async fn list(&self, model_id: &str, container: &str, query: &ListQuery) -> Result<ResultSet, AppError> {
        let entity = self.entity(model_id, container)?;
        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map(|n| n as usize).unwrap_or(usize::MAX);
        let mut rs = ResultSet::for_entity(entity);
        for r in self.matching(entity, query.filter.as_deref()).into_iter().skip(offset).take(limit) {
            let n = normalized(entity, &r);
            rs.rows.push(n.into_iter().map(|(_, v)| v).collect());
        }
        Ok(rs)
    }

    async fn count(&self, model_id: &str, container: &str, filter: Option<&str>) -> Result<u64, AppError> {
        let entity = self.entity(model_id, container)?;
        Ok(self.matching(entity, filter).len() as u64)
    }

    async fn get(&self, model_id: &str, container: &str, key: &str) -> Result<Option<Record>, AppError> {
        let entity = self.entity(model_id, container)?;
        let rows = self.matching(entity, None);
        Ok(self.position(entity, &rows, key)?.map(|i| normalized(entity, &rows[i])))
    }

    async fn create(&self, model_id: &str, container: &str, props: &Record) -> Result<Record, AppError> {
        let entity = self.entity(model_id, container)?;
        let fields = map_properties(entity, props, WriteMode::Insert)?;
        let mut record = Record::new();
        for (i, v) in fields {
            record.insert(entity.attributes[i].prop_name.clone(), v.to_json());
        }
        for a in &entity.attributes {
            if record.contains_key(&a.prop_name) {
                continue;
            }
            if a.is_primary_key && a.has_default {
                let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
                record.insert(a.prop_name.clone(), json!(id));
            }
        }
        let key = compose_key(entity, lookup_in(&record))?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(entity.id.clone()).or_default();
        if self.position(entity, rows, &key)?.is_some() {
            return Err(AppError::BadRequest(format!("duplicate key {}", key)));
        }
        rows.push(record.clone());
        Ok(normalized(entity, &record))
    }

    async fn update(&self, model_id: &str, container: &str, key: &str, props: &Record) -> Result<Record, AppError> {
        let entity = self.entity(model_id, container)?;
        let fields = map_properties(entity, props, WriteMode::Update)?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(entity.id.clone()).or_default();
        let i = self
            .position(entity, rows, key)?
            .ok_or_else(|| entity_not_found(entity, key))?;
        for (idx, v) in fields {
            rows[i].insert(entity.attributes[idx].prop_name.clone(), v.to_json());
        }
        Ok(normalized(entity, &rows[i]))
    }

    async fn delete(&self, model_id: &str, container: &str, key: &str) -> Result<(), AppError> {
        let entity = self.entity(model_id, container)?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(entity.id.clone()).or_default();
        let i = self
            .position(entity, rows, key)?
            .ok_or_else(|| entity_not_found(entity, key))?;
        rows.remove(i);
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Router over a seeded in-memory store, mounted at both [`MOUNTS`].
pub fn app() -> (Router, Arc<MemoryDataManager>) {
    let manager = Arc::new(MemoryDataManager::seeded());
    let mounts: Vec<String> = MOUNTS.iter().map(|m| m.to_string()).collect();
    let router = app_router(AppState::new(manager.clone()), &mounts, 64 * 1024);
    (router, manager)
}
