//! Generic CRUD over a registered resource. Every result is projected onto the exposed fields.

use crate::error::AppError;
use crate::filter::Filter;
use crate::registry::Resource;
use crate::store::{Record, Store};
use serde_json::{json, Value};

pub struct CrudService;

/// Data-level error payload: reported in the body with status 400, not as an `AppError`.
pub fn not_found_payload(id: &str) -> Value {
    json!({ "error": format!("no matching object found for id: {}", id) })
}

pub fn deletion_payload() -> Value {
    json!({ "status": "deletion successful" })
}

/// Parse a path id as the integer primary key. Unparseable ids match nothing.
pub fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

impl CrudService {
    /// Projected rows matching the filter, in primary key order.
    pub async fn retrieve(
        store: &dyn Store,
        resource: &Resource,
        filter: &Filter,
    ) -> Result<Vec<Record>, AppError> {
        let rows = store.filter(&resource.schema, filter).await?;
        Ok(rows.iter().map(|r| resource.project(r)).collect())
    }

    /// Projected row as a JSON object, or the not-found error payload.
    pub async fn retrieve_one(store: &dyn Store, resource: &Resource, raw_id: &str) -> Result<Value, AppError> {
        let Some(id) = parse_id(raw_id) else {
            return Ok(not_found_payload(raw_id));
        };
        Ok(match store.get(&resource.schema, id).await? {
            Some(row) => Value::Object(resource.project(&row)),
            None => not_found_payload(raw_id),
        })
    }

    /// Create from submitted fields; anything not exposed is dropped before it reaches storage.
    pub async fn create<I>(store: &dyn Store, resource: &Resource, submitted: I) -> Result<Record, AppError>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let values = resource.writable_changes(submitted).map_err(AppError::Validation)?;
        let row = store.create(&resource.schema, &values).await?;
        tracing::debug!(resource = %resource.name(), id = ?row.get(&resource.schema.primary_key().name), "created");
        Ok(resource.project(&row))
    }

    /// Apply the same exposed-field changes to every row matching the filter.
    pub async fn update<I>(
        store: &dyn Store,
        resource: &Resource,
        filter: &Filter,
        submitted: I,
    ) -> Result<Vec<Record>, AppError>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let changes = resource.writable_changes(submitted).map_err(AppError::Validation)?;
        let rows = store.update_where(&resource.schema, filter, &changes).await?;
        tracing::debug!(resource = %resource.name(), updated = rows.len(), "bulk updated");
        Ok(rows.iter().map(|r| resource.project(r)).collect())
    }

    /// Fetch one row, apply changes, persist. Missing rows yield the not-found payload.
    pub async fn update_one<I>(
        store: &dyn Store,
        resource: &Resource,
        raw_id: &str,
        submitted: I,
    ) -> Result<Value, AppError>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let Some(id) = parse_id(raw_id) else {
            return Ok(not_found_payload(raw_id));
        };
        if store.get(&resource.schema, id).await?.is_none() {
            return Ok(not_found_payload(raw_id));
        }
        let changes = resource.writable_changes(submitted).map_err(AppError::Validation)?;
        Ok(match store.update(&resource.schema, id, &changes).await? {
            Some(row) => Value::Object(resource.project(&row)),
            None => not_found_payload(raw_id),
        })
    }

    /// Fetch one row and delete it. Missing rows yield the not-found payload.
    pub async fn delete_one(store: &dyn Store, resource: &Resource, raw_id: &str) -> Result<Value, AppError> {
        let Some(id) = parse_id(raw_id) else {
            return Ok(not_found_payload(raw_id));
        };
        if store.get(&resource.schema, id).await?.is_none() {
            return Ok(not_found_payload(raw_id));
        }
        if !store.delete(&resource.schema, id).await? {
            return Ok(not_found_payload(raw_id));
        }
        tracing::debug!(resource = %resource.name(), id, "deleted");
        Ok(deletion_payload())
    }
}
