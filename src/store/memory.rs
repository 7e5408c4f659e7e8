//! Process-local store. Tables are created on first use; ids auto-increment from 1.

use crate::error::AppError;
use crate::filter::Filter;
use crate::registry::{FieldDef, FieldKind, ModelSchema};
use crate::store::{Record, Store};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct MemoryTable {
    next_id: i64,
    rows: BTreeMap<i64, Record>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, MemoryTable>>, AppError> {
        self.tables
            .read()
            .map_err(|_| AppError::Store("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, MemoryTable>>, AppError> {
        self.tables
            .write()
            .map_err(|_| AppError::Store("memory store lock poisoned".into()))
    }
}

/// Value a column takes when a create omits it.
fn default_value(def: &FieldDef) -> Result<Value, AppError> {
    if def.has_default {
        return Ok(match def.kind {
            FieldKind::Integer => Value::from(0),
            FieldKind::Float => Value::from(0.0),
            FieldKind::Text => Value::String(String::new()),
            FieldKind::Boolean => Value::Bool(false),
            FieldKind::Timestamp => Value::String(chrono::Utc::now().to_rfc3339()),
            FieldKind::Uuid => Value::String(uuid::Uuid::new_v4().to_string()),
            FieldKind::Json => Value::Null,
        });
    }
    if def.nullable {
        return Ok(Value::Null);
    }
    Err(AppError::Validation(format!("{} is required", def.name)))
}

fn apply_changes(schema: &ModelSchema, row: &mut Record, changes: &Record) {
    let pk = &schema.primary_key().name;
    for (k, v) in changes {
        if k != pk && schema.get_field(k).is_some() {
            row.insert(k.clone(), v.clone());
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn check_schema(&self, schema: &ModelSchema) -> Result<(), AppError> {
        let mut tables = self.write()?;
        tables.entry(schema.table().to_string()).or_insert_with(|| MemoryTable {
            next_id: 1,
            rows: BTreeMap::new(),
        });
        Ok(())
    }

    async fn filter(&self, schema: &ModelSchema, filter: &Filter) -> Result<Vec<Record>, AppError> {
        let tables = self.read()?;
        let Some(table) = tables.get(schema.table()) else {
            return Ok(Vec::new());
        };
        Ok(table
            .rows
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn get(&self, schema: &ModelSchema, id: i64) -> Result<Option<Record>, AppError> {
        let tables = self.read()?;
        Ok(tables
            .get(schema.table())
            .and_then(|t| t.rows.get(&id))
            .cloned())
    }

    async fn create(&self, schema: &ModelSchema, values: &Record) -> Result<Record, AppError> {
        let mut tables = self.write()?;
        let table = tables.entry(schema.table().to_string()).or_default();
        let pk = schema.primary_key();
        let id = match values.get(&pk.name) {
            Some(v) => v
                .as_i64()
                .ok_or_else(|| AppError::Validation(format!("{} must be integer", pk.name)))?,
            None => table.next_id.max(1),
        };
        if table.rows.contains_key(&id) {
            return Err(AppError::Store(format!(
                "duplicate key {}={} in {}",
                pk.name,
                id,
                schema.table()
            )));
        }

        let mut row = Record::new();
        for def in schema.fields() {
            let value = if def.name == pk.name {
                Value::from(id)
            } else {
                match values.get(&def.name) {
                    Some(v) => v.clone(),
                    None => default_value(def)?,
                }
            };
            row.insert(def.name.clone(), value);
        }
        table.next_id = table.next_id.max(id + 1);
        table.rows.insert(id, row.clone());
        tracing::debug!(table = %schema.table(), id, "memory insert");
        Ok(row)
    }

    async fn update(
        &self,
        schema: &ModelSchema,
        id: i64,
        changes: &Record,
    ) -> Result<Option<Record>, AppError> {
        let mut tables = self.write()?;
        let Some(row) = tables.get_mut(schema.table()).and_then(|t| t.rows.get_mut(&id)) else {
            return Ok(None);
        };
        apply_changes(schema, row, changes);
        tracing::debug!(table = %schema.table(), id, "memory update");
        Ok(Some(row.clone()))
    }

    async fn update_where(
        &self,
        schema: &ModelSchema,
        filter: &Filter,
        changes: &Record,
    ) -> Result<Vec<Record>, AppError> {
        let mut tables = self.write()?;
        let Some(table) = tables.get_mut(schema.table()) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for row in table.rows.values_mut().filter(|r| filter.matches(r)) {
            apply_changes(schema, row, changes);
            out.push(row.clone());
        }
        tracing::debug!(table = %schema.table(), updated = out.len(), "memory bulk update");
        Ok(out)
    }

    async fn delete(&self, schema: &ModelSchema, id: i64) -> Result<bool, AppError> {
        let mut tables = self.write()?;
        let deleted = tables
            .get_mut(schema.table())
            .is_some_and(|t| t.rows.remove(&id).is_some());
        tracing::debug!(table = %schema.table(), id, deleted, "memory delete");
        Ok(deleted)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.read().map(|_| ())
    }
}
