//! Single-record endpoint: GET reads, PUT updates, DELETE deletes, POST is refused.

use crate::error::AppError;
use crate::handlers::body::submitted_fields;
use crate::handlers::ViewState;
use crate::registry::HttpVerb;
use crate::response::{forbidden, rest_response};
use crate::service::CrudService;
use axum::{
    extract::{rejection::PathRejection, Path, Request, State},
    response::Response,
};

pub async fn detail_view(
    State(view): State<ViewState>,
    id: Result<Path<String>, PathRejection>,
    req: Request,
) -> Result<Response, AppError> {
    let Some(verb) = view.permit(req.method()) else {
        return Ok(forbidden());
    };
    let Path(id) = id.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let resource = view.resource.as_ref();
    let store = view.store.as_ref();
    let payload = match verb {
        HttpVerb::Get => CrudService::retrieve_one(store, resource, &id).await?,
        HttpVerb::Put => {
            let submitted = submitted_fields(req).await?;
            CrudService::update_one(store, resource, &id, submitted).await?
        }
        HttpVerb::Delete => CrudService::delete_one(store, resource, &id).await?,
        // Creation only happens on the collection.
        HttpVerb::Post => return Ok(forbidden()),
    };
    Ok(rest_response(verb, payload))
}
