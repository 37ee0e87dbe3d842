//! Key strings: primary-key values joined with `:` in key-declaration order.

use crate::error::AppError;
use crate::model::{Entity, FieldValue};
use serde_json::Value;

pub const KEY_SEPARATOR: char = ':';

fn malformed(entity: &Entity, key: &str, reason: impl Into<String>) -> AppError {
    AppError::MalformedKey {
        container: entity.id.clone(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Split a key string and convert each component to its key attribute's type.
pub fn parse_key(entity: &Entity, key: &str) -> Result<Vec<FieldValue>, AppError> {
    if entity.key_len() == 0 {
        return Err(malformed(entity, key, "entity has no primary key"));
    }
    let parts: Vec<&str> = key.split(KEY_SEPARATOR).collect();
    if parts.len() != entity.key_len() {
        return Err(malformed(
            entity,
            key,
            format!("expected {} key component(s), got {}", entity.key_len(), parts.len()),
        ));
    }
    entity
        .key_attributes()
        .zip(parts)
        .map(|(attr, part)| {
            attr.convert_text(part)
                .map_err(|e| malformed(entity, key, format!("{}: {}", attr.prop_name, e)))
        })
        .collect()
}

/// Build a key string from named values, e.g. query parameters or a request body.
pub fn compose_key<'a, F>(entity: &Entity, lookup: F) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<&'a Value>,
{
    if entity.key_len() == 0 {
        return Err(malformed(entity, "", "entity has no primary key"));
    }
    let mut parts: Vec<String> = Vec::with_capacity(entity.key_len());
    for attr in entity.key_attributes() {
        let value = lookup(&attr.prop_name).ok_or_else(|| {
            malformed(entity, &parts.join(":"), format!("missing key attribute {}", attr.prop_name))
        })?;
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => {
                return Err(malformed(
                    entity,
                    &parts.join(":"),
                    format!("key attribute {} must be a scalar", attr.prop_name),
                ))
            }
        };
        parts.push(text);
    }
    Ok(parts.join(":"))
}

/// Property lookup over a JSON object: exact name first, then case-insensitive.
pub fn lookup_in<'a>(map: &'a serde_json::Map<String, Value>) -> impl Fn(&str) -> Option<&'a Value> + 'a {
    move |name| {
        map.get(name).or_else(|| {
            map.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }
}
