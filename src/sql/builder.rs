//! Builds parameterized SELECT, COUNT, INSERT, UPDATE, DELETE for an [`Entity`].

use crate::model::{Attribute, DataType, Entity, FieldValue};

/// Longest filter text sent to the store; longer input is truncated.
pub const MAX_FILTER_LENGTH: usize = 10_000;

const MAX_ROW_BOUND: u64 = i64::MAX as u64;

/// Quote identifier for PostgreSQL (safe: names come from the catalog).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<FieldValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: FieldValue) -> usize {
        self.params.push(v);
        self.params.len()
    }

    /// `$n::<cast>` placeholder for a value written to `attr`.
    fn placeholder(&mut self, attr: &Attribute, v: FieldValue) -> String {
        let n = self.push_param(v);
        format!("${}::{}", n, attr.cast_type)
    }
}

/// Escape LIKE wildcards so user text matches literally (`\` is the escape character).
pub fn escape_like(input: &str) -> String {
    input.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Trimmed, length-capped filter text, or None when blank.
pub fn normalize_filter(filter: Option<&str>) -> Option<String> {
    let trimmed = filter?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_FILTER_LENGTH).collect())
}

/// SELECT list in attribute order. Types without a native decoder are rendered as text.
fn select_column_list(entity: &Entity) -> String {
    entity.attributes.iter().map(select_expr).collect::<Vec<_>>().join(", ")
}

fn select_expr(a: &Attribute) -> String {
    let q = quoted(&a.prop_name);
    if a.sql_type == "money" {
        // money::text is locale formatted ("$31.50")
        format!("{}::numeric::text AS {}", q, q)
    } else if needs_text_cast(a) {
        format!("{}::text AS {}", q, q)
    } else {
        q
    }
}

/// Decoded from a `::text` rendering rather than the native type.
pub fn needs_text_cast(a: &Attribute) -> bool {
    match a.data_type {
        DataType::Currency | DataType::Unknown => true,
        DataType::Time => a.sql_type == "timetz",
        DataType::String => !matches!(a.sql_type.as_str(), "text" | "varchar" | "bpchar" | "name"),
        _ => false,
    }
}

/// Shared WHERE clause for list and count: the free-text filter over searchable attributes.
fn push_filter(q: &mut QueryBuf, entity: &Entity, filter: Option<&str>) {
    let Some(text) = normalize_filter(filter) else { return };
    let searchable: Vec<&Attribute> = entity.searchable_attributes().collect();
    if searchable.is_empty() {
        q.sql.push_str(" WHERE FALSE");
        return;
    }
    let n = q.push_param(FieldValue::Text(format!("%{}%", escape_like(&text))));
    let parts: Vec<String> = searchable
        .iter()
        .map(|a| format!("COALESCE({}::text, '') ILIKE ${} ESCAPE '\\'", quoted(&a.prop_name), n))
        .collect();
    q.sql.push_str(&format!(" WHERE ({})", parts.join(" OR ")));
}

fn key_condition(q: &mut QueryBuf, entity: &Entity, key: Vec<FieldValue>) -> String {
    let attrs: Vec<&Attribute> = entity.key_attributes().collect();
    attrs
        .into_iter()
        .zip(key)
        .map(|(a, v)| {
            let ph = q.placeholder(a, v);
            format!("{} = {}", quoted(&a.prop_name), ph)
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn order_by_key(entity: &Entity) -> String {
    let cols: Vec<String> = entity.key_attributes().map(|a| quoted(&a.prop_name)).collect();
    if cols.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {}", cols.join(", "))
    }
}

/// SELECT with optional free-text filter, ordered by key, optional OFFSET/LIMIT.
pub fn select_list(
    entity: &Entity,
    schema: &str,
    filter: Option<&str>,
    offset: Option<u64>,
    limit: Option<u64>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {}",
        select_column_list(entity),
        qualified_table(schema, &entity.table_name)
    );
    push_filter(&mut q, entity, filter);
    q.sql.push_str(&order_by_key(entity));
    // LIMIT/OFFSET are bigint; a limit past i64::MAX is no limit
    if let Some(n) = limit.filter(|n| *n <= MAX_ROW_BOUND) {
        q.sql.push_str(&format!(" LIMIT {}", n));
    }
    if let Some(n) = offset {
        q.sql.push_str(&format!(" OFFSET {}", n.min(MAX_ROW_BOUND)));
    }
    q
}

/// COUNT(*) with the same filter as [`select_list`].
pub fn count(entity: &Entity, schema: &str, filter: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("SELECT COUNT(*) FROM {}", qualified_table(schema, &entity.table_name));
    push_filter(&mut q, entity, filter);
    q
}

/// SELECT by (composite) key; `key` is in key-declaration order.
pub fn select_by_key(entity: &Entity, schema: &str, key: Vec<FieldValue>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cond = key_condition(&mut q, entity, key);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {}",
        select_column_list(entity),
        qualified_table(schema, &entity.table_name),
        cond
    );
    q
}

/// INSERT the given fields (attribute index, value); omitted attributes take store defaults.
pub fn insert(entity: &Entity, schema: &str, fields: Vec<(usize, FieldValue)>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table_name);
    let returning = select_column_list(entity);
    if fields.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning);
        return q;
    }
    let mut cols = Vec::with_capacity(fields.len());
    let mut placeholders = Vec::with_capacity(fields.len());
    for (i, v) in fields {
        let a = &entity.attributes[i];
        cols.push(quoted(&a.prop_name));
        placeholders.push(q.placeholder(a, v));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table,
        cols.join(", "),
        placeholders.join(", "),
        returning
    );
    q
}

/// UPDATE by key, setting only the given fields. With no fields this is a plain SELECT by key.
pub fn update(entity: &Entity, schema: &str, key: Vec<FieldValue>, fields: Vec<(usize, FieldValue)>) -> QueryBuf {
    if fields.is_empty() {
        return select_by_key(entity, schema, key);
    }
    let mut q = QueryBuf::new();
    let mut sets = Vec::with_capacity(fields.len());
    for (i, v) in fields {
        let a = &entity.attributes[i];
        let ph = q.placeholder(a, v);
        sets.push(format!("{} = {}", quoted(&a.prop_name), ph));
    }
    let cond = key_condition(&mut q, entity, key);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} RETURNING {}",
        qualified_table(schema, &entity.table_name),
        sets.join(", "),
        cond,
        select_column_list(entity)
    );
    q
}

/// DELETE by key, returning the removed row.
pub fn delete(entity: &Entity, schema: &str, key: Vec<FieldValue>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cond = key_condition(&mut q, entity, key);
    q.sql = format!(
        "DELETE FROM {} WHERE {} RETURNING {}",
        qualified_table(schema, &entity.table_name),
        cond,
        select_column_list(entity)
    );
    q
}
