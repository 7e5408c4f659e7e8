//! Storage backends. Handlers never touch storage directly; everything goes through [`Store`].

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::AppError;
use crate::filter::Filter;
use crate::registry::ModelSchema;
use async_trait::async_trait;

/// One persisted row as a JSON object, keyed by field name in declared order.
pub type Record = serde_json::Map<String, serde_json::Value>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Check that storage can serve this schema: the table and every declared field exist.
    async fn check_schema(&self, schema: &ModelSchema) -> Result<(), AppError>;

    /// Rows matching the filter, ordered by primary key.
    async fn filter(&self, schema: &ModelSchema, filter: &Filter) -> Result<Vec<Record>, AppError>;

    async fn get(&self, schema: &ModelSchema, id: i64) -> Result<Option<Record>, AppError>;

    /// Insert one row. Omitted fields take storage defaults; the primary key is generated unless given.
    async fn create(&self, schema: &ModelSchema, values: &Record) -> Result<Record, AppError>;

    /// Apply changes to one row. `None` when no row has that id.
    async fn update(
        &self,
        schema: &ModelSchema,
        id: i64,
        changes: &Record,
    ) -> Result<Option<Record>, AppError>;

    /// Apply the same changes to every matching row; returns the updated rows.
    async fn update_where(
        &self,
        schema: &ModelSchema,
        filter: &Filter,
        changes: &Record,
    ) -> Result<Vec<Record>, AppError>;

    /// Returns whether a row was deleted.
    async fn delete(&self, schema: &ModelSchema, id: i64) -> Result<bool, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}
