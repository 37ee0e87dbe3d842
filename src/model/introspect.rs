//! Schema introspection: PostgreSQL catalog -> [`Model`].
//!
//! Catalog rows are read with a handful of `information_schema` queries; turning them into a model is
//! the pure [`build_model`] so it can run without a database.

use crate::case::prettify_name;
use crate::config::{AttributeAnnotation, ModelConfig};
use crate::error::{AppError, ConfigError};
use crate::model::{Attribute, DataType, Entity, LookupRef, Model};
use sqlx::{PgPool, Row};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug)]
pub struct TableRow {
    pub table_name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ColumnRow {
    pub table_name: String,
    pub column_name: String,
    pub ordinal_position: i32,
    pub udt_schema: String,
    pub udt_name: String,
    pub is_nullable: bool,
    pub has_default: bool,
    /// `GENERATED ALWAYS` (computed or identity); never written by clients.
    pub is_generated: bool,
    pub max_length: Option<i32>,
    pub description: Option<String>,
}

#[derive(Clone, Debug)]
pub struct KeyRow {
    pub table_name: String,
    pub column_name: String,
    pub position: i32,
}

#[derive(Clone, Debug)]
pub struct ForeignKeyRow {
    pub constraint_name: String,
    pub table_name: String,
    pub column_name: String,
    pub foreign_table: String,
    pub foreign_column: String,
}

/// Raw catalog content for one schema.
#[derive(Clone, Debug, Default)]
pub struct CatalogSnapshot {
    pub tables: Vec<TableRow>,
    pub columns: Vec<ColumnRow>,
    pub primary_keys: Vec<KeyRow>,
    pub foreign_keys: Vec<ForeignKeyRow>,
}

const TABLES_SQL: &str = r#"
SELECT t.table_name::text AS table_name,
       obj_description(format('%I.%I', t.table_schema, t.table_name)::regclass, 'pg_class') AS description
FROM information_schema.tables t
WHERE t.table_schema = $1 AND t.table_type = 'BASE TABLE'
ORDER BY t.table_name
"#;

const COLUMNS_SQL: &str = r#"
SELECT c.table_name::text AS table_name,
       c.column_name::text AS column_name,
       c.ordinal_position::int4 AS ordinal_position,
       c.udt_schema::text AS udt_schema,
       c.udt_name::text AS udt_name,
       (c.is_nullable = 'YES') AS is_nullable,
       (c.column_default IS NOT NULL OR c.is_identity = 'YES' OR c.is_generated = 'ALWAYS') AS has_default,
       (c.is_generated = 'ALWAYS' OR COALESCE(c.identity_generation = 'ALWAYS', false)) AS is_generated,
       c.character_maximum_length::int4 AS max_length,
       col_description(format('%I.%I', c.table_schema, c.table_name)::regclass, c.ordinal_position::int4) AS description
FROM information_schema.columns c
JOIN information_schema.tables t ON t.table_schema = c.table_schema AND t.table_name = c.table_name
WHERE c.table_schema = $1 AND t.table_type = 'BASE TABLE'
ORDER BY c.table_name, c.ordinal_position
"#;

const PRIMARY_KEYS_SQL: &str = r#"
SELECT kcu.table_name::text AS table_name,
       kcu.column_name::text AS column_name,
       kcu.ordinal_position::int4 AS position
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_schema = tc.constraint_schema
 AND kcu.constraint_name = tc.constraint_name
 AND kcu.table_name = tc.table_name
WHERE tc.table_schema = $1 AND tc.constraint_type = 'PRIMARY KEY'
ORDER BY kcu.table_name, kcu.ordinal_position
"#;

// pg_constraint rather than information_schema: FK names are only unique per table, and
// conkey/confkey pair referencing and referenced columns by position.
const FOREIGN_KEYS_SQL: &str = r#"
SELECT con.conname::text AS constraint_name,
       cl.relname::text AS table_name,
       att.attname::text AS column_name,
       fcl.relname::text AS foreign_table,
       fatt.attname::text AS foreign_column
FROM pg_catalog.pg_constraint con
JOIN pg_catalog.pg_class cl ON cl.oid = con.conrelid
JOIN pg_catalog.pg_namespace ns ON ns.oid = cl.relnamespace
JOIN pg_catalog.pg_class fcl ON fcl.oid = con.confrelid
JOIN pg_catalog.pg_namespace fns ON fns.oid = fcl.relnamespace
CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, fattnum, ord)
JOIN pg_catalog.pg_attribute att ON att.attrelid = con.conrelid AND att.attnum = k.attnum
JOIN pg_catalog.pg_attribute fatt ON fatt.attrelid = con.confrelid AND fatt.attnum = k.fattnum
WHERE con.contype = 'f' AND ns.nspname = $1 AND fns.nspname = $1
ORDER BY cl.relname, con.conname, k.ord
"#;

/// Read the catalog for `schema`.
pub async fn load_catalog(pool: &PgPool, schema: &str) -> Result<CatalogSnapshot, AppError> {
    tracing::debug!(schema = %schema, "reading catalog");
    let tables = sqlx::query(TABLES_SQL)
        .bind(schema)
        .fetch_all(pool)
        .await?
        .iter()
        .map(|r| {
            Ok(TableRow {
                table_name: r.try_get("table_name")?,
                description: r.try_get("description")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    let columns = sqlx::query(COLUMNS_SQL)
        .bind(schema)
        .fetch_all(pool)
        .await?
        .iter()
        .map(|r| {
            Ok(ColumnRow {
                table_name: r.try_get("table_name")?,
                column_name: r.try_get("column_name")?,
                ordinal_position: r.try_get("ordinal_position")?,
                udt_schema: r.try_get("udt_schema")?,
                udt_name: r.try_get("udt_name")?,
                is_nullable: r.try_get("is_nullable")?,
                has_default: r.try_get("has_default")?,
                is_generated: r.try_get("is_generated")?,
                max_length: r.try_get("max_length")?,
                description: r.try_get("description")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    let primary_keys = sqlx::query(PRIMARY_KEYS_SQL)
        .bind(schema)
        .fetch_all(pool)
        .await?
        .iter()
        .map(|r| {
            Ok(KeyRow {
                table_name: r.try_get("table_name")?,
                column_name: r.try_get("column_name")?,
                position: r.try_get("position")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    let foreign_keys = sqlx::query(FOREIGN_KEYS_SQL)
        .bind(schema)
        .fetch_all(pool)
        .await?
        .iter()
        .map(|r| {
            Ok(ForeignKeyRow {
                constraint_name: r.try_get("constraint_name")?,
                table_name: r.try_get("table_name")?,
                column_name: r.try_get("column_name")?,
                foreign_table: r.try_get("foreign_table")?,
                foreign_column: r.try_get("foreign_column")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    Ok(CatalogSnapshot {
        tables,
        columns,
        primary_keys,
        foreign_keys,
    })
}

/// Introspect the configured schema and build its model.
pub async fn introspect(pool: &PgPool, config: &ModelConfig) -> Result<Model, AppError> {
    let catalog = load_catalog(pool, config.schema_name()).await?;
    let model = build_model(config, &catalog)?;
    tracing::info!(
        model = %model.id,
        schema = %model.schema,
        entities = model.entities().len(),
        "model introspected"
    );
    Ok(model)
}

fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn cast_type_for(col: &ColumnRow) -> String {
    if col.udt_schema == "pg_catalog" {
        col.udt_name.clone()
    } else {
        format!("{}.{}", quoted(&col.udt_schema), quoted(&col.udt_name))
    }
}

/// Build a model from catalog rows and annotations.
pub fn build_model(config: &ModelConfig, catalog: &CatalogSnapshot) -> Result<Model, ConfigError> {
    let known_tables: HashSet<&str> = catalog.tables.iter().map(|t| t.table_name.as_str()).collect();
    for (table, ann) in &config.entities {
        if !known_tables.contains(table.as_str()) {
            tracing::warn!(model = %config.id, table = %table, "annotation names unknown table; ignored");
            continue;
        }
        let columns: HashSet<&str> = catalog
            .columns
            .iter()
            .filter(|c| c.table_name == *table)
            .map(|c| c.column_name.as_str())
            .collect();
        for column in ann.attributes.keys() {
            if !columns.contains(column.as_str()) {
                tracing::warn!(model = %config.id, table = %table, column = %column, "annotation names unknown column; ignored");
            }
        }
    }

    let enabled_tables: Vec<&TableRow> = catalog
        .tables
        .iter()
        .filter(|t| config.entities.get(&t.table_name).map_or(true, |a| a.enabled))
        .collect();

    let entity_id_of = |table: &str| -> String {
        config
            .entities
            .get(table)
            .and_then(|a| a.id.clone())
            .unwrap_or_else(|| table.to_string())
    };
    let table_to_entity: HashMap<&str, String> = enabled_tables
        .iter()
        .map(|t| (t.table_name.as_str(), entity_id_of(&t.table_name)))
        .collect();

    let mut seen = HashSet::new();
    for id in table_to_entity.values() {
        if !seen.insert(id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "model '{}' has more than one table exposed as entity '{}'",
                config.id, id
            )));
        }
    }

    let mut key_pos: HashMap<(&str, &str), usize> = HashMap::new();
    let mut per_table_keys: HashMap<&str, Vec<&KeyRow>> = HashMap::new();
    for k in &catalog.primary_keys {
        per_table_keys.entry(k.table_name.as_str()).or_default().push(k);
    }
    for (table, mut keys) in per_table_keys {
        keys.sort_by_key(|k| k.position);
        for (i, k) in keys.into_iter().enumerate() {
            key_pos.insert((table, k.column_name.as_str()), i);
        }
    }

    // single-column foreign keys only; composite ones have no attribute-level lookup.
    // Constraint names are unique per table, not per schema.
    let mut fk_rows: HashMap<(&str, &str), Vec<&ForeignKeyRow>> = HashMap::new();
    for fk in &catalog.foreign_keys {
        fk_rows
            .entry((fk.table_name.as_str(), fk.constraint_name.as_str()))
            .or_default()
            .push(fk);
    }
    let mut lookups: HashMap<(&str, &str), LookupRef> = HashMap::new();
    for rows in fk_rows.values() {
        let [fk] = rows.as_slice() else { continue };
        let Some(target) = table_to_entity.get(fk.foreign_table.as_str()) else { continue };
        lookups.insert(
            (fk.table_name.as_str(), fk.column_name.as_str()),
            LookupRef {
                entity: target.clone(),
                attribute: format!("{}.{}", target, fk.foreign_column),
            },
        );
    }

    let mut columns_by_table: HashMap<&str, Vec<&ColumnRow>> = HashMap::new();
    for c in &catalog.columns {
        columns_by_table.entry(c.table_name.as_str()).or_default().push(c);
    }

    let default_attr = AttributeAnnotation::default();
    let mut entities = Vec::with_capacity(enabled_tables.len());
    for table in enabled_tables {
        let name = table.table_name.as_str();
        let entity_id = &table_to_entity[name];
        let ann = config.entities.get(name);
        let mut cols = columns_by_table.remove(name).unwrap_or_default();
        cols.sort_by_key(|c| c.ordinal_position);

        let attributes = cols
            .into_iter()
            .map(|c| {
                let a = ann
                    .and_then(|e| e.attributes.get(&c.column_name))
                    .unwrap_or(&default_attr);
                let key_position = key_pos.get(&(name, c.column_name.as_str())).copied();
                Attribute {
                    id: format!("{}.{}", entity_id, c.column_name),
                    prop_name: c.column_name.clone(),
                    caption: a.caption.clone().unwrap_or_else(|| prettify_name(&c.column_name)),
                    data_type: DataType::from_pg(&c.udt_name),
                    is_primary_key: key_position.is_some(),
                    is_nullable: c.is_nullable,
                    is_editable: !c.is_generated && !a.read_only,
                    is_visible: a.visible,
                    is_enabled: a.enabled,
                    size: c.max_length.and_then(|n| u32::try_from(n).ok()),
                    description: a.description.clone().or_else(|| c.description.clone()),
                    lookup: lookups.get(&(name, c.column_name.as_str())).cloned(),
                    has_default: c.has_default,
                    sql_type: c.udt_name.clone(),
                    cast_type: cast_type_for(c),
                    key_position,
                }
            })
            .collect();

        let caption = ann
            .and_then(|e| e.caption.clone())
            .unwrap_or_else(|| prettify_name(entity_id));
        let description = ann
            .and_then(|e| e.description.clone())
            .or_else(|| table.description.clone());
        entities.push(Entity::new(entity_id.clone(), caption, description, name, attributes));
    }

    Ok(Model::new(
        config.id.clone(),
        config.display_name(),
        config.schema_name(),
        entities,
    ))
}
