//! Model schema descriptors: the declared fields of a storage table.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the generated primary key every model carries as its first field.
pub const PRIMARY_KEY: &str = "id";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
    Uuid,
    Json,
}

impl FieldKind {
    /// PostgreSQL type used to cast bound parameters.
    pub fn pg_type(&self) -> &'static str {
        match self {
            FieldKind::Integer => "bigint",
            FieldKind::Float => "double precision",
            FieldKind::Text => "text",
            FieldKind::Boolean => "boolean",
            FieldKind::Timestamp => "timestamptz",
            FieldKind::Uuid => "uuid",
            FieldKind::Json => "jsonb",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Text => "text",
            FieldKind::Boolean => "boolean",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Uuid => "uuid",
            FieldKind::Json => "json",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub nullable: bool,
    /// Whether storage fills the column when a create omits it.
    #[serde(default)]
    pub has_default: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldDef {
            name: name.into(),
            kind,
            nullable: false,
            has_default: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Convert a submitted value (usually a form string) to this field's kind.
    /// Returns a human readable reason on mismatch; callers pick the error kind.
    pub fn coerce(&self, value: Value) -> Result<Value, String> {
        let mismatch = || format!("{} must be {}", self.name, self.kind.as_str());
        match value {
            Value::Null => {
                if self.nullable {
                    Ok(Value::Null)
                } else {
                    Err(format!("{} may not be null", self.name))
                }
            }
            Value::String(s) => {
                if s.is_empty() && self.nullable && self.kind != FieldKind::Text {
                    return Ok(Value::Null);
                }
                self.coerce_str(&s).ok_or_else(mismatch)
            }
            Value::Number(n) => match self.kind {
                FieldKind::Integer => n.as_i64().map(Value::from).ok_or_else(mismatch),
                FieldKind::Float | FieldKind::Json => Ok(Value::Number(n)),
                FieldKind::Text => Ok(Value::String(n.to_string())),
                _ => Err(mismatch()),
            },
            Value::Bool(b) => match self.kind {
                FieldKind::Boolean | FieldKind::Json => Ok(Value::Bool(b)),
                FieldKind::Text => Ok(Value::String(b.to_string())),
                _ => Err(mismatch()),
            },
            other @ (Value::Array(_) | Value::Object(_)) => match self.kind {
                FieldKind::Json => Ok(other),
                _ => Err(mismatch()),
            },
        }
    }

    fn coerce_str(&self, s: &str) -> Option<Value> {
        match self.kind {
            FieldKind::Text => Some(Value::String(s.to_string())),
            FieldKind::Integer => s.trim().parse::<i64>().ok().map(Value::from),
            FieldKind::Float => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            FieldKind::Boolean => parse_bool(s).map(Value::Bool),
            FieldKind::Uuid => uuid::Uuid::parse_str(s.trim())
                .ok()
                .map(|u| Value::String(u.to_string())),
            FieldKind::Timestamp => parse_timestamp(s.trim()).map(Value::String),
            FieldKind::Json => Some(serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Accepts RFC 3339 or a naive `YYYY-MM-DD[ T]HH:MM:SS` (taken as UTC); normalized to RFC 3339.
fn parse_timestamp(s: &str) -> Option<String> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&chrono::Utc).to_rfc3339());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().to_rfc3339());
        }
    }
    None
}

/// Declared shape of one storage table. The primary key `id` is always the first field.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSchema {
    table: String,
    fields: Vec<FieldDef>,
}

impl ModelSchema {
    pub fn new(table: impl Into<String>) -> Self {
        ModelSchema {
            table: table.into(),
            fields: vec![FieldDef::new(PRIMARY_KEY, FieldKind::Integer).with_default()],
        }
    }

    /// Declare a non-null field.
    pub fn field(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.field_def(FieldDef::new(name, kind))
    }

    pub fn nullable_field(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.field_def(FieldDef::new(name, kind).nullable())
    }

    /// Declare a field; redeclaring a name replaces it in place.
    pub fn field_def(mut self, def: FieldDef) -> Self {
        match self.fields.iter_mut().find(|f| f.name == def.name) {
            Some(existing) => *existing = def,
            None => self.fields.push(def),
        }
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &FieldDef {
        &self.fields[0]
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Implemented by types that describe a storage table, so they can be registered by type.
pub trait Model {
    fn schema() -> ModelSchema;
}
