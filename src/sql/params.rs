//! Bind [`FieldValue`] to PostgreSQL statements.

use crate::model::FieldValue;
use sqlx::encode::{Encode, IsNull};
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

impl<'q> Encode<'q, Postgres> for FieldValue {
    fn encode_by_ref(&self, buf: &mut <Postgres as Database>::ArgumentBuffer<'q>) -> Result<IsNull, BoxDynError> {
        Ok(match self {
            FieldValue::Null => IsNull::Yes,
            FieldValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            FieldValue::Int(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            FieldValue::Float(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            FieldValue::Text(s) => <&str as Encode<Postgres>>::encode_by_ref(&s.as_str(), buf)?,
            FieldValue::Uuid(u) => <uuid::Uuid as Encode<Postgres>>::encode_by_ref(u, buf)?,
            FieldValue::Json(v) => <serde_json::Value as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }

    /// Each variant declares its own wire type; statements cast placeholders to the column type.
    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            FieldValue::Null | FieldValue::Text(_) => PgTypeInfo::with_name("TEXT"),
            FieldValue::Bool(_) => PgTypeInfo::with_name("BOOL"),
            FieldValue::Int(_) => PgTypeInfo::with_name("INT8"),
            FieldValue::Float(_) => PgTypeInfo::with_name("FLOAT8"),
            FieldValue::Uuid(_) => PgTypeInfo::with_name("UUID"),
            FieldValue::Json(_) => PgTypeInfo::with_name("JSONB"),
        })
    }
}

impl sqlx::Type<Postgres> for FieldValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}
