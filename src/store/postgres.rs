//! PostgreSQL store over a sqlx pool. Tables must already exist; nothing here issues DDL.

use crate::error::AppError;
use crate::filter::Filter;
use crate::registry::ModelSchema;
use crate::sql::{self, bind_all, QueryBuf};
use crate::store::{Record, Store};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashSet;

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
    /// Schema qualifying every table; `None` uses the connection's search_path.
    schema: Option<String>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool, schema: None }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    fn pg_schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Record>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Record>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_record))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn check_schema(&self, schema: &ModelSchema) -> Result<(), AppError> {
        let sql = match self.pg_schema() {
            Some(_) => "SELECT column_name::text FROM information_schema.columns WHERE table_schema = $2 AND table_name = $1",
            None => "SELECT column_name::text FROM information_schema.columns WHERE table_schema = current_schema() AND table_name = $1",
        };
        tracing::debug!(sql = %sql, table = %schema.table(), "query");
        let mut query = sqlx::query_scalar::<_, String>(sql).bind(schema.table());
        if let Some(s) = self.pg_schema() {
            query = query.bind(s);
        }
        let columns: HashSet<String> = query.fetch_all(&self.pool).await?.into_iter().collect();
        if columns.is_empty() {
            return Err(AppError::Store(format!("table {} does not exist", schema.table())));
        }
        let missing: Vec<&str> = schema
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .filter(|name| !columns.contains(*name))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Store(format!(
                "table {} is missing columns: {}",
                schema.table(),
                missing.join(", ")
            )));
        }
        Ok(())
    }

    async fn filter(&self, schema: &ModelSchema, filter: &Filter) -> Result<Vec<Record>, AppError> {
        self.fetch_all(&sql::select_list(schema, self.pg_schema(), filter)).await
    }

    async fn get(&self, schema: &ModelSchema, id: i64) -> Result<Option<Record>, AppError> {
        self.fetch_optional(&sql::select_by_id(schema, self.pg_schema(), id)).await
    }

    async fn create(&self, schema: &ModelSchema, values: &Record) -> Result<Record, AppError> {
        self.fetch_optional(&sql::insert(schema, self.pg_schema(), values))
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(
        &self,
        schema: &ModelSchema,
        id: i64,
        changes: &Record,
    ) -> Result<Option<Record>, AppError> {
        self.fetch_optional(&sql::update(schema, self.pg_schema(), id, changes)).await
    }

    async fn update_where(
        &self,
        schema: &ModelSchema,
        filter: &Filter,
        changes: &Record,
    ) -> Result<Vec<Record>, AppError> {
        self.fetch_all(&sql::update_where(schema, self.pg_schema(), filter, changes)).await
    }

    async fn delete(&self, schema: &ModelSchema, id: i64) -> Result<bool, AppError> {
        let q = sql::delete(schema, self.pg_schema(), id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let result = bind_all(sqlx::query(&q.sql), &q.params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> Record {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Record::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(v) = row.try_get::<Option<i64>, _>(name) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(name) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(name) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(name) {
        return v
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(name) {
        return v
            .and_then(|n| serde_json::Number::from_f64(n as f64))
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(name) {
        return v.map(Value::Bool).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return v.map(|u| Value::String(u.to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return v.map(|d| Value::String(d.to_rfc3339())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return v
            .map(|d| Value::String(d.and_utc().to_rfc3339()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(name) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Value>, _>(name) {
        return v.unwrap_or(Value::Null);
    }
    Value::Null
}
