//! Collection endpoint: GET lists, POST creates, PUT bulk-updates, DELETE is refused.

use crate::error::AppError;
use crate::filter::Filter;
use crate::handlers::body::{filter_from_value, query_param, submitted_fields, take_field};
use crate::handlers::ViewState;
use crate::registry::HttpVerb;
use crate::response::{forbidden, rest_response};
use crate::service::CrudService;
use crate::store::Record;
use axum::{
    extract::{Request, State},
    response::Response,
};
use serde_json::Value;

fn rows_to_json(rows: Vec<Record>) -> Value {
    Value::Array(rows.into_iter().map(Value::Object).collect())
}

pub async fn list_view(State(view): State<ViewState>, req: Request) -> Result<Response, AppError> {
    let Some(verb) = view.permit(req.method()) else {
        return Ok(forbidden());
    };
    let resource = view.resource.as_ref();
    let store = view.store.as_ref();
    match verb {
        HttpVerb::Get => {
            let q = query_param(&req, "q")?;
            let filter = Filter::parse(q.as_deref(), &resource.schema)?;
            let rows = CrudService::retrieve(store, resource, &filter).await?;
            Ok(rest_response(verb, rows_to_json(rows)))
        }
        HttpVerb::Post => {
            let submitted = submitted_fields(req).await?;
            let row = CrudService::create(store, resource, submitted).await?;
            Ok(rest_response(verb, Value::Object(row)))
        }
        HttpVerb::Put => {
            let query_q = query_param(&req, "q")?;
            let mut submitted = submitted_fields(req).await?;
            let filter = match take_field(&mut submitted, "q") {
                Some(q) => filter_from_value(q, &resource.schema)?,
                None => Filter::parse(query_q.as_deref(), &resource.schema)?,
            };
            let rows = CrudService::update(store, resource, &filter, submitted).await?;
            Ok(rest_response(verb, rows_to_json(rows)))
        }
        // Collections are never deleted wholesale.
        HttpVerb::Delete => Ok(forbidden()),
    }
}
