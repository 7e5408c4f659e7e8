//! Request body and query string decoding for resource handlers.

use crate::error::AppError;
use crate::filter::Filter;
use crate::registry::ModelSchema;
use axum::{
    body::Bytes,
    extract::{FromRequest, Query, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde_json::Value;

/// Submitted fields in request order. Form values arrive as strings and are coerced later.
pub type Submitted = Vec<(String, Value)>;

fn content_type(req: &Request) -> String {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Decode a form-encoded or JSON-object body. An empty body without a content type submits nothing.
pub async fn submitted_fields(req: Request) -> Result<Submitted, AppError> {
    let ct = content_type(&req);
    if ct.starts_with("application/json") {
        let Json(body) = Json::<serde_json::Map<String, Value>>::from_request(req, &())
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        return Ok(body.into_iter().collect());
    }
    if ct.starts_with("application/x-www-form-urlencoded") {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, &())
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        return Ok(pairs.into_iter().map(|(k, v)| (k, Value::String(v))).collect());
    }
    let bytes = Bytes::from_request(req, &())
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    if bytes.is_empty() {
        Ok(Vec::new())
    } else {
        Err(AppError::BadRequest(
            "body must be form-encoded or a JSON object".into(),
        ))
    }
}

/// Last value of a query string parameter.
pub fn query_param(req: &Request, name: &str) -> Result<Option<String>, AppError> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(req.uri())
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(pairs.into_iter().rev().find(|(k, _)| k == name).map(|(_, v)| v))
}

/// Remove every occurrence of `name` from the submitted fields, returning the last one.
pub fn take_field(submitted: &mut Submitted, name: &str) -> Option<Value> {
    let mut taken = None;
    submitted.retain(|(k, v)| {
        if k == name {
            taken = Some(v.clone());
            false
        } else {
            true
        }
    });
    taken
}

/// A `q` filter taken from a body: JSON text from a form, or the array itself from a JSON body.
pub fn filter_from_value(value: Value, schema: &ModelSchema) -> Result<Filter, AppError> {
    match value {
        Value::String(s) => Filter::parse(Some(&s), schema),
        Value::Null => Ok(Filter::all()),
        other => Filter::from_json(other, schema),
    }
}
