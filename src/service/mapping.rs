//! Property-bag -> typed field values, via the entity's field map.

use crate::error::AppError;
use crate::model::{Entity, FieldValue, Record};

/// Which attributes a property bag may write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// New record: any editable attribute, keys included.
    Insert,
    /// Existing record: editable non-key attributes; keys only address the row.
    Update,
}

/// Convert the properties matching writable attributes, in attribute order.
///
/// Unknown, read-only and (on update) key properties are skipped. The first value that does not
/// convert fails the whole mapping with [`AppError::Validation`]. On insert, an editable non-null
/// attribute with no store default must be supplied.
pub fn map_properties(entity: &Entity, props: &Record, mode: WriteMode) -> Result<Vec<(usize, FieldValue)>, AppError> {
    let mut fields = Vec::with_capacity(props.len());
    for (name, value) in props {
        let Some(index) = entity.field_index(name) else {
            tracing::debug!(container = %entity.id, property = %name, "unknown property ignored");
            continue;
        };
        let attr = &entity.attributes[index];
        if !attr.is_editable {
            tracing::debug!(container = %entity.id, property = %name, "read-only property ignored");
            continue;
        }
        if mode == WriteMode::Update && attr.is_primary_key {
            continue;
        }
        let converted = attr.convert_json(value).map_err(|e| AppError::Validation {
            attribute: attr.id.clone(),
            message: e.to_string(),
        })?;
        fields.push((index, converted));
    }
    fields.sort_by_key(|(i, _)| *i);
    if mode == WriteMode::Insert {
        require_missing(entity, &fields)?;
    }
    Ok(fields)
}

fn require_missing(entity: &Entity, fields: &[(usize, FieldValue)]) -> Result<(), AppError> {
    let missing = entity.attributes.iter().enumerate().find(|(i, a)| {
        a.is_editable && !a.is_nullable && !a.has_default && fields.binary_search_by_key(i, |(j, _)| *j).is_err()
    });
    match missing {
        Some((_, attr)) => Err(AppError::Validation {
            attribute: attr.id.clone(),
            message: "attribute is required".into(),
        }),
        None => Ok(()),
    }
}
