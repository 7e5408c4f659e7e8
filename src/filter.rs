//! Filter expressions for list reads and bulk updates.
//!
//! The `q` parameter is a JSON array of objects. Each key is `field` or `field__lookup`;
//! every key of every object is one clause and all clauses are ANDed:
//! `[{"author": "Poe"}, {"status__gte": 2, "short_title__icontains": "raven"}]`.

use crate::error::AppError;
use crate::registry::{FieldKind, ModelSchema};
use crate::store::Record;
use serde_json::Value;
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    Exact,
    IExact,
    Contains,
    IContains,
    StartsWith,
    EndsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    IsNull,
}

impl FromStr for Lookup {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "exact" => Lookup::Exact,
            "iexact" => Lookup::IExact,
            "contains" => Lookup::Contains,
            "icontains" => Lookup::IContains,
            "startswith" => Lookup::StartsWith,
            "endswith" => Lookup::EndsWith,
            "gt" => Lookup::Gt,
            "gte" => Lookup::Gte,
            "lt" => Lookup::Lt,
            "lte" => Lookup::Lte,
            "in" => Lookup::In,
            "isnull" => Lookup::IsNull,
            other => return Err(AppError::Filter(format!("unsupported lookup '{}'", other))),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Clause {
    pub field: String,
    pub lookup: Lookup,
    /// Operand, already coerced: a string for text lookups, an array for `in`, a bool for `isnull`.
    pub value: Value,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    pub clauses: Vec<Clause>,
}

impl Filter {
    /// Matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Parse a raw `q` value. `None` and blank strings match everything.
    pub fn parse(raw: Option<&str>, schema: &ModelSchema) -> Result<Self, AppError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::all()),
            Some(s) => {
                let value: Value = serde_json::from_str(s)
                    .map_err(|e| AppError::Filter(format!("q is not valid JSON: {}", e)))?;
                Self::from_json(value, schema)
            }
        }
    }

    pub fn from_json(value: Value, schema: &ModelSchema) -> Result<Self, AppError> {
        let Value::Array(items) = value else {
            return Err(AppError::Filter("q must be a JSON array of objects".into()));
        };
        let mut clauses = Vec::new();
        for item in items {
            let Value::Object(obj) = item else {
                return Err(AppError::Filter("each filter clause must be a JSON object".into()));
            };
            for (key, operand) in obj {
                clauses.push(parse_clause(&key, operand, schema)?);
            }
        }
        Ok(Filter { clauses })
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|c| c.matches(record))
    }
}

fn parse_clause(key: &str, operand: Value, schema: &ModelSchema) -> Result<Clause, AppError> {
    let (field, lookup) = match key.rsplit_once("__") {
        Some((field, lookup)) if schema.get_field(field).is_some() => (field, lookup.parse()?),
        _ => (key, Lookup::Exact),
    };
    let def = schema
        .get_field(field)
        .ok_or_else(|| AppError::Filter(format!("unknown field '{}'", field)))?;

    let (lookup, value) = match lookup {
        Lookup::Exact if operand.is_null() => (Lookup::IsNull, Value::Bool(true)),
        Lookup::IsNull => match operand {
            Value::Bool(b) => (Lookup::IsNull, Value::Bool(b)),
            _ => return Err(AppError::Filter(format!("{}__isnull takes true or false", field))),
        },
        Lookup::In => match operand {
            Value::Array(items) => {
                let coerced = items
                    .into_iter()
                    .map(|v| def.coerce(v))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(AppError::Filter)?;
                (Lookup::In, Value::Array(coerced))
            }
            _ => return Err(AppError::Filter(format!("{}__in takes an array", field))),
        },
        Lookup::IExact | Lookup::Contains | Lookup::IContains | Lookup::StartsWith | Lookup::EndsWith => {
            let s = match operand {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return Err(AppError::Filter(format!("{} lookup on {} takes a string", key, field))),
            };
            (lookup, Value::String(s))
        }
        _ => (lookup, def.coerce(operand).map_err(AppError::Filter)?),
    };

    if matches!(def.kind, FieldKind::Json) && !matches!(lookup, Lookup::Exact | Lookup::IsNull) {
        return Err(AppError::Filter(format!("json field {} only supports exact and isnull", field)));
    }

    Ok(Clause {
        field: field.to_string(),
        lookup,
        value,
    })
}

impl Clause {
    pub fn matches(&self, record: &Record) -> bool {
        let actual = record.get(&self.field).unwrap_or(&Value::Null);
        match self.lookup {
            Lookup::IsNull => actual.is_null() == self.value.as_bool().unwrap_or(true),
            _ if actual.is_null() => false,
            Lookup::Exact => values_eq(actual, &self.value),
            Lookup::In => self
                .value
                .as_array()
                .is_some_and(|items| items.iter().any(|v| values_eq(actual, v))),
            Lookup::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
            Lookup::Gte => matches!(compare(actual, &self.value), Some(Ordering::Greater | Ordering::Equal)),
            Lookup::Lt => compare(actual, &self.value) == Some(Ordering::Less),
            Lookup::Lte => matches!(compare(actual, &self.value), Some(Ordering::Less | Ordering::Equal)),
            Lookup::IExact | Lookup::Contains | Lookup::IContains | Lookup::StartsWith | Lookup::EndsWith => {
                let (Some(haystack), Some(needle)) = (text_of(actual), self.value.as_str()) else {
                    return false;
                };
                match self.lookup {
                    Lookup::IExact => haystack.to_lowercase() == needle.to_lowercase(),
                    Lookup::Contains => haystack.contains(needle),
                    Lookup::IContains => haystack.to_lowercase().contains(&needle.to_lowercase()),
                    Lookup::StartsWith => haystack.starts_with(needle),
                    _ => haystack.ends_with(needle),
                }
            }
        }
    }
}

fn text_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Integers compare exactly; anything involving a float compares as f64.
fn compare_numbers(n: &serde_json::Number, m: &serde_json::Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (n.as_i64(), m.as_i64()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (n.as_u64(), m.as_u64()) {
        return Some(x.cmp(&y));
    }
    n.as_f64()?.partial_cmp(&m.as_f64()?)
}

fn values_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => compare_numbers(n, m) == Some(Ordering::Equal),
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => compare_numbers(n, m),
        (Value::String(s), Value::String(t)) => Some(s.cmp(t)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
