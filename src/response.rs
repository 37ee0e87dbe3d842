//! Response envelopes and request body parsing.

use crate::error::AppError;
use crate::model::{Entity, Model, Record};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultColumn {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

/// Tabular query result; every row holds one value per column, in column order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResultSet {
    pub cols: Vec<ResultColumn>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Empty result with one column per entity attribute.
    pub fn for_entity(entity: &Entity) -> Self {
        ResultSet {
            cols: entity
                .attributes
                .iter()
                .map(|a| ResultColumn {
                    id: a.id.clone(),
                    label: a.caption.clone(),
                    data_type: a.data_type.to_string(),
                })
                .collect(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_records: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub result_set: ResultSet,
    pub meta: FetchMeta,
}

#[derive(Serialize)]
pub struct ModelResponse {
    pub model: Arc<Model>,
}

#[derive(Serialize)]
pub struct RecordResponse {
    pub record: Option<Record>,
}

/// Parse a JSON body whatever the declared content type; an empty body is `T::default()`.
pub fn parse_body<T: DeserializeOwned + Default>(bytes: &[u8]) -> Result<T, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes).map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::category;

    #[test]
    fn result_columns_follow_attributes() {
        let rs = ResultSet::for_entity(&category());
        let ids: Vec<&str> = rs.cols.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["Category.Id", "Category.CategoryName", "Category.Description", "Category.Picture"]);
        let v = serde_json::to_value(&rs.cols[1]).unwrap();
        assert_eq!(v, serde_json::json!({ "id": "Category.CategoryName", "label": "Category Name", "type": "String" }));
    }

    #[test]
    fn total_is_omitted_unless_requested() {
        let body = FetchResponse {
            result_set: ResultSet::default(),
            meta: FetchMeta::default(),
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["meta"], serde_json::json!({}));
        assert!(v.get("resultSet").is_some());
    }

    #[test]
    fn empty_body_is_default() {
        let m: Record = parse_body(b"").unwrap();
        assert!(m.is_empty());
        let m: Record = parse_body(b"  \n").unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn bad_json_is_a_bad_request() {
        let err = parse_body::<Record>(b"{nope").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        let err = parse_body::<Record>(b"[1,2]").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
