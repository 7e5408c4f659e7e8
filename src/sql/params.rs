//! Bind serde_json::Value parameters to sqlx queries.

use crate::registry::FieldKind;
use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A value that can be bound to a PostgreSQL query. Converts from serde_json::Value.
/// Placeholders carry an explicit cast (`$1::bigint`), so strings are bound as text and cast server-side.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Json(Value),
}

impl PgBindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => PgBindValue::Null,
            Value::Bool(b) => PgBindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PgBindValue::I64(i)
                } else {
                    PgBindValue::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => PgBindValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => PgBindValue::Json(v.clone()),
        }
    }

    /// Bind form for a value headed to a column of `kind`. Non-null values for json columns
    /// always bind as jsonb; there is no cast from bigint, boolean, or plain text to jsonb.
    pub fn for_kind(v: &Value, kind: FieldKind) -> Self {
        match (kind, v) {
            (_, Value::Null) => PgBindValue::Null,
            (FieldKind::Json, _) => PgBindValue::Json(v.clone()),
            _ => Self::from_json(v),
        }
    }
}

pub fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[(Value, FieldKind)],
) -> Query<'q, Postgres, PgArguments> {
    for (value, kind) in params {
        query = match PgBindValue::for_kind(value, *kind) {
            PgBindValue::Null => query.bind(None::<String>),
            PgBindValue::Bool(b) => query.bind(b),
            PgBindValue::I64(n) => query.bind(n),
            PgBindValue::F64(n) => query.bind(n),
            PgBindValue::String(s) => query.bind(s),
            PgBindValue::Json(v) => query.bind(v),
        };
    }
    query
}
