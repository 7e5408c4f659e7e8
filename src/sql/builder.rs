//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from a model schema.

use crate::filter::{Clause, Filter, Lookup};
use crate::registry::{FieldDef, FieldKind, ModelSchema};
use serde_json::Value;

/// Quote identifier for PostgreSQL (names are validated at registration).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Table name, schema-qualified when a schema is given.
pub fn qualified_table(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(s) => format!("{}.{}", quoted(s), quoted(table)),
        None => quoted(table),
    }
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    /// Bound values with the kind of the column they target.
    pub params: Vec<(Value, FieldKind)>,
}

impl QueryBuf {
    fn new() -> Self {
        Self::default()
    }

    /// Push a parameter and return its `$n::type` placeholder.
    fn placeholder(&mut self, def: &FieldDef, v: Value) -> String {
        self.params.push((v, def.kind));
        format!("${}::{}", self.params.len(), def.kind.pg_type())
    }

    fn text_placeholder(&mut self, v: Value) -> String {
        self.params.push((v, FieldKind::Text));
        format!("${}::text", self.params.len())
    }
}

fn column_list(model: &ModelSchema) -> String {
    model
        .fields()
        .iter()
        .map(|f| quoted(&f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn clause_sql(q: &mut QueryBuf, model: &ModelSchema, clause: &Clause) -> Option<String> {
    let def = model.get_field(&clause.field)?;
    let col = quoted(&def.name);
    let text = |q: &mut QueryBuf, pattern: String| q.text_placeholder(Value::String(pattern));
    let needle = clause.value.as_str().unwrap_or_default();
    Some(match clause.lookup {
        Lookup::Exact => format!("{} = {}", col, q.placeholder(def, clause.value.clone())),
        Lookup::Gt => format!("{} > {}", col, q.placeholder(def, clause.value.clone())),
        Lookup::Gte => format!("{} >= {}", col, q.placeholder(def, clause.value.clone())),
        Lookup::Lt => format!("{} < {}", col, q.placeholder(def, clause.value.clone())),
        Lookup::Lte => format!("{} <= {}", col, q.placeholder(def, clause.value.clone())),
        Lookup::IExact => format!("LOWER({}::text) = LOWER({})", col, text(q, needle.to_string())),
        Lookup::Contains => format!("{}::text LIKE {}", col, text(q, format!("%{}%", escape_like(needle)))),
        Lookup::IContains => format!("{}::text ILIKE {}", col, text(q, format!("%{}%", escape_like(needle)))),
        Lookup::StartsWith => format!("{}::text LIKE {}", col, text(q, format!("{}%", escape_like(needle)))),
        Lookup::EndsWith => format!("{}::text LIKE {}", col, text(q, format!("%{}", escape_like(needle)))),
        Lookup::In => {
            let items = clause.value.as_array().cloned().unwrap_or_default();
            if items.is_empty() {
                "FALSE".to_string()
            } else {
                let phs: Vec<String> = items.into_iter().map(|v| q.placeholder(def, v)).collect();
                format!("{} IN ({})", col, phs.join(", "))
            }
        }
        Lookup::IsNull => {
            if clause.value.as_bool().unwrap_or(true) {
                format!("{} IS NULL", col)
            } else {
                format!("{} IS NOT NULL", col)
            }
        }
    })
}

fn where_clause(q: &mut QueryBuf, model: &ModelSchema, filter: &Filter) -> String {
    let parts: Vec<String> = filter
        .clauses
        .iter()
        .filter_map(|c| clause_sql(q, model, c))
        .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT with filter clauses, ORDER BY pk.
pub fn select_list(model: &ModelSchema, pg_schema: Option<&str>, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(pg_schema, model.table());
    let where_sql = where_clause(&mut q, model, filter);
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}",
        column_list(model),
        table,
        where_sql,
        quoted(&model.primary_key().name)
    );
    q
}

/// SELECT by primary key.
pub fn select_by_id(model: &ModelSchema, pg_schema: Option<&str>, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(pg_schema, model.table());
    let pk = model.primary_key();
    let ph = q.placeholder(pk, Value::from(id));
    q.sql = format!("SELECT {} FROM {} WHERE {} = {}", column_list(model), table, quoted(&pk.name), ph);
    q
}

/// INSERT only the provided declared columns, so storage defaults apply to the rest.
pub fn insert(model: &ModelSchema, pg_schema: Option<&str>, values: &serde_json::Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(pg_schema, model.table());
    let mut cols = Vec::new();
    let mut phs = Vec::new();
    for def in model.fields() {
        let Some(v) = values.get(&def.name) else { continue };
        cols.push(quoted(&def.name));
        phs.push(q.placeholder(def, v.clone()));
    }
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, column_list(model))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            phs.join(", "),
            column_list(model)
        )
    };
    q
}

fn set_clause(q: &mut QueryBuf, model: &ModelSchema, changes: &serde_json::Map<String, Value>) -> Vec<String> {
    let pk = &model.primary_key().name;
    let mut sets = Vec::new();
    for def in model.fields() {
        if def.name == *pk {
            continue;
        }
        let Some(v) = changes.get(&def.name) else { continue };
        let ph = q.placeholder(def, v.clone());
        sets.push(format!("{} = {}", quoted(&def.name), ph));
    }
    sets
}

/// UPDATE one row by id. With no applicable changes this degrades to a SELECT of the row.
pub fn update(
    model: &ModelSchema,
    pg_schema: Option<&str>,
    id: i64,
    changes: &serde_json::Map<String, Value>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let sets = set_clause(&mut q, model, changes);
    if sets.is_empty() {
        return select_by_id(model, pg_schema, id);
    }
    let table = qualified_table(pg_schema, model.table());
    let pk = model.primary_key();
    let id_ph = q.placeholder(pk, Value::from(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        table,
        sets.join(", "),
        quoted(&pk.name),
        id_ph,
        column_list(model)
    );
    q
}

/// UPDATE every row matching the filter. With no applicable changes this degrades to a SELECT.
pub fn update_where(
    model: &ModelSchema,
    pg_schema: Option<&str>,
    filter: &Filter,
    changes: &serde_json::Map<String, Value>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let sets = set_clause(&mut q, model, changes);
    if sets.is_empty() {
        return select_list(model, pg_schema, filter);
    }
    let table = qualified_table(pg_schema, model.table());
    let where_sql = where_clause(&mut q, model, filter);
    q.sql = format!(
        "UPDATE {} SET {}{} RETURNING {}",
        table,
        sets.join(", "),
        where_sql,
        column_list(model)
    );
    q
}

/// DELETE by id.
pub fn delete(model: &ModelSchema, pg_schema: Option<&str>, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(pg_schema, model.table());
    let pk = model.primary_key();
    let ph = q.placeholder(pk, Value::from(id));
    q.sql = format!("DELETE FROM {} WHERE {} = {}", table, quoted(&pk.name), ph);
    q
}
