//! Typed field values and per-type conversion from JSON / key text.

use crate::model::{Attribute, DataType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("decimal pattern compiles")
});

static BYTEA_HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\x([0-9A-Fa-f]{2})*$").expect("bytea pattern compiles"));

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A converted value ready to be bound to a statement.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Canonical text form; the statement casts it to the column type.
    Text(String),
    Uuid(uuid::Uuid),
    Json(Value),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(n) => Value::Number((*n).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Uuid(u) => Value::String(u.to_string()),
            FieldValue::Json(v) => v.clone(),
        }
    }
}

/// Why a value could not be converted to an attribute's type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertError(pub String);

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn expected(ty: DataType, v: &Value) -> ConvertError {
    ConvertError(format!("expected {} value, got {}", ty, json_kind(v)))
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Attribute {
    /// Convert a property-bag value, enforcing nullability and declared size.
    pub fn convert_json(&self, v: &Value) -> Result<FieldValue, ConvertError> {
        if v.is_null() {
            if !self.is_nullable {
                return Err(ConvertError("attribute is not nullable".into()));
            }
            return Ok(FieldValue::Null);
        }
        let out = self.convert_non_null(v)?;
        if let (Some(max), FieldValue::Text(s)) = (self.size, &out) {
            if self.data_type == DataType::String && s.chars().count() > max as usize {
                return Err(ConvertError(format!("value longer than {} characters", max)));
            }
        }
        Ok(out)
    }

    /// Convert one component of a key string.
    pub fn convert_text(&self, s: &str) -> Result<FieldValue, ConvertError> {
        self.convert_non_null(&Value::String(s.to_string()))
    }

    fn convert_non_null(&self, v: &Value) -> Result<FieldValue, ConvertError> {
        let ty = self.data_type;
        match ty {
            DataType::String | DataType::Unknown => match v {
                Value::String(s) => Ok(FieldValue::Text(s.clone())),
                Value::Number(n) => Ok(FieldValue::Text(n.to_string())),
                Value::Bool(b) => Ok(FieldValue::Text(b.to_string())),
                _ => Err(expected(ty, v)),
            },
            DataType::Int32 | DataType::Int64 => {
                let n = integer_of(v).ok_or_else(|| expected(ty, v))?;
                let (min, max) = match self.sql_type.as_str() {
                    "int2" => (i64::from(i16::MIN), i64::from(i16::MAX)),
                    "int4" => (i64::from(i32::MIN), i64::from(i32::MAX)),
                    _ => (i64::MIN, i64::MAX),
                };
                if n < min || n > max {
                    return Err(ConvertError(format!("{} is out of range for {}", n, self.sql_type)));
                }
                Ok(FieldValue::Int(n))
            }
            DataType::Bool => match v {
                Value::Bool(b) => Ok(FieldValue::Bool(*b)),
                Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(FieldValue::Bool(true)),
                Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(FieldValue::Bool(false)),
                Value::Number(n) if n.as_i64() == Some(1) => Ok(FieldValue::Bool(true)),
                Value::Number(n) if n.as_i64() == Some(0) => Ok(FieldValue::Bool(false)),
                _ => Err(expected(ty, v)),
            },
            DataType::Float => match v {
                Value::Number(n) => n.as_f64().map(FieldValue::Float).ok_or_else(|| expected(ty, v)),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(FieldValue::Float)
                    .ok_or_else(|| expected(ty, v)),
                _ => Err(expected(ty, v)),
            },
            DataType::Currency => match v {
                Value::Number(n) => Ok(FieldValue::Text(n.to_string())),
                Value::String(s) if DECIMAL.is_match(s.trim()) => Ok(FieldValue::Text(s.trim().to_string())),
                _ => Err(expected(ty, v)),
            },
            DataType::Date => {
                let s = v.as_str().ok_or_else(|| expected(ty, v))?.trim();
                parse_date(s)
                    .map(|d| FieldValue::Text(d.format("%Y-%m-%d").to_string()))
                    .ok_or_else(|| ConvertError(format!("'{}' is not a date (YYYY-MM-DD)", s)))
            }
            DataType::Time => {
                let s = v.as_str().ok_or_else(|| expected(ty, v))?.trim();
                if self.is_tz_aware() {
                    // offset suffix is validated by the store
                    return Ok(FieldValue::Text(s.to_string()));
                }
                parse_time(s)
                    .map(|t| FieldValue::Text(t.format("%H:%M:%S%.f").to_string()))
                    .ok_or_else(|| ConvertError(format!("'{}' is not a time (HH:MM[:SS])", s)))
            }
            DataType::DateTime => {
                let s = v.as_str().ok_or_else(|| expected(ty, v))?.trim();
                if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                    return Ok(FieldValue::Text(if self.is_tz_aware() {
                        dt.to_rfc3339()
                    } else {
                        dt.naive_local().format("%Y-%m-%dT%H:%M:%S%.f").to_string()
                    }));
                }
                parse_naive_datetime(s)
                    .map(|dt| FieldValue::Text(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
                    .ok_or_else(|| ConvertError(format!("'{}' is not a date/time", s)))
            }
            DataType::Guid => {
                let s = v.as_str().ok_or_else(|| expected(ty, v))?;
                uuid::Uuid::parse_str(s.trim())
                    .map(FieldValue::Uuid)
                    .map_err(|_| ConvertError(format!("'{}' is not a uuid", s)))
            }
            DataType::Blob => match v {
                Value::String(s) if BYTEA_HEX.is_match(s) => Ok(FieldValue::Text(s.clone())),
                _ => Err(ConvertError("expected hex bytes ('\\x…')".into())),
            },
            DataType::Json => Ok(FieldValue::Json(v.clone())),
        }
    }
}

fn integer_of(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_naive_datetime(s).map(|dt| dt.date()))
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::attr;
    use serde_json::json;

    #[test]
    fn integers_accept_numbers_and_numeric_strings() {
        let a = attr("Product", "UnitsInStock", "int4", None);
        assert_eq!(a.convert_json(&json!(17)), Ok(FieldValue::Int(17)));
        assert_eq!(a.convert_json(&json!("17")), Ok(FieldValue::Int(17)));
        assert_eq!(a.convert_json(&json!(17.0)), Ok(FieldValue::Int(17)));
        assert!(a.convert_json(&json!(17.5)).is_err());
        assert!(a.convert_json(&json!("seventeen")).is_err());
    }

    #[test]
    fn integer_range_follows_column_width() {
        let small = attr("OrderDetail", "Quantity", "int2", None);
        assert!(small.convert_json(&json!(40_000)).is_err());
        let big = attr("Order", "Id", "int8", None);
        assert_eq!(big.convert_json(&json!(40_000_000_000i64)), Ok(FieldValue::Int(40_000_000_000)));
    }

    #[test]
    fn null_respects_nullability() {
        let key = attr("Category", "Id", "int4", Some(0));
        assert!(key.convert_json(&Value::Null).is_err());
        let desc = attr("Category", "Description", "text", None);
        assert_eq!(desc.convert_json(&Value::Null), Ok(FieldValue::Null));
    }

    #[test]
    fn strings_respect_declared_size() {
        let mut name = attr("Category", "CategoryName", "varchar", None);
        name.size = Some(5);
        assert!(name.convert_json(&json!("Seafood")).is_err());
        assert_eq!(name.convert_json(&json!("Fish")), Ok(FieldValue::Text("Fish".into())));
    }

    #[test]
    fn currency_keeps_decimal_text() {
        let price = attr("Product", "UnitPrice", "numeric", None);
        assert_eq!(price.convert_json(&json!(18.5)), Ok(FieldValue::Text("18.5".into())));
        assert_eq!(price.convert_json(&json!(" 18.50 ")), Ok(FieldValue::Text("18.50".into())));
        assert!(price.convert_json(&json!("18,50")).is_err());
    }

    #[test]
    fn dates_and_times_are_canonicalized() {
        let d = attr("Order", "OrderDate", "date", None);
        assert_eq!(d.convert_json(&json!("1996-07-04")), Ok(FieldValue::Text("1996-07-04".into())));
        assert_eq!(
            d.convert_json(&json!("1996-07-04T00:00:00")),
            Ok(FieldValue::Text("1996-07-04".into()))
        );
        assert!(d.convert_json(&json!("04/07/1996")).is_err());

        let ts = attr("Order", "ShippedAt", "timestamp", None);
        assert_eq!(
            ts.convert_json(&json!("1996-07-16 10:30")),
            Ok(FieldValue::Text("1996-07-16T10:30:00".into()))
        );
        let tz = attr("Order", "CreatedAt", "timestamptz", None);
        assert_eq!(
            tz.convert_json(&json!("1996-07-16T10:30:00Z")),
            Ok(FieldValue::Text("1996-07-16T10:30:00+00:00".into()))
        );

        let t = attr("Shift", "StartsAt", "time", None);
        assert_eq!(t.convert_json(&json!("08:15")), Ok(FieldValue::Text("08:15:00".into())));
    }

    #[test]
    fn guid_and_blob_are_validated() {
        let g = attr("Session", "Token", "uuid", None);
        let u = uuid::Uuid::new_v4();
        assert_eq!(g.convert_json(&json!(u.to_string())), Ok(FieldValue::Uuid(u)));
        assert!(g.convert_json(&json!("not-a-uuid")).is_err());

        let b = attr("Category", "Picture", "bytea", None);
        assert!(b.convert_json(&json!("\\xDEADBEEF")).is_ok());
        assert!(b.convert_json(&json!("DEADBEEF")).is_err());
    }

    #[test]
    fn objects_are_rejected_for_scalar_types() {
        let name = attr("Category", "CategoryName", "varchar", None);
        let err = name.convert_json(&json!({ "a": 1 })).unwrap_err();
        assert_eq!(err.0, "expected String value, got object");
        let doc = attr("Category", "Meta", "jsonb", None);
        assert_eq!(doc.convert_json(&json!({ "a": 1 })), Ok(FieldValue::Json(json!({ "a": 1 }))));
    }

    #[test]
    fn key_text_converts_like_strings() {
        let id = attr("Category", "Id", "int4", Some(0));
        assert_eq!(id.convert_text("4"), Ok(FieldValue::Int(4)));
        assert!(id.convert_text("ALFKI").is_err());
        let code = attr("Customer", "Id", "bpchar", Some(0));
        assert_eq!(code.convert_text("ALFKI"), Ok(FieldValue::Text("ALFKI".into())));
    }
}
