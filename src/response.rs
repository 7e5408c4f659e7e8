//! Status mapping for resource responses.

use crate::registry::HttpVerb;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

/// Success status per verb: GET 200, POST 201, PUT 201, DELETE 204.
pub fn status_for(verb: HttpVerb) -> StatusCode {
    match verb {
        HttpVerb::Get => StatusCode::OK,
        HttpVerb::Post | HttpVerb::Put => StatusCode::CREATED,
        HttpVerb::Delete => StatusCode::NO_CONTENT,
    }
}

/// Payload objects carrying an `error` key are reported with 400 whatever the verb.
pub fn is_error_payload(payload: &Value) -> bool {
    payload.as_object().is_some_and(|o| o.contains_key("error"))
}

/// JSON response with the verb's status, or 400 for an error payload.
pub fn rest_response(verb: HttpVerb, payload: Value) -> Response {
    let status = if is_error_payload(&payload) {
        StatusCode::BAD_REQUEST
    } else {
        status_for(verb)
    };
    (status, Json(payload)).into_response()
}

/// 403 with an empty body.
pub fn forbidden() -> Response {
    StatusCode::FORBIDDEN.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_payload_overrides_verb_status() {
        let ok = rest_response(HttpVerb::Delete, json!({"status": "deletion successful"}));
        assert_eq!(ok.status(), StatusCode::NO_CONTENT);
        let err = rest_response(HttpVerb::Delete, json!({"error": "gone"}));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let list = rest_response(HttpVerb::Get, json!([{"error": "just data"}]));
        assert_eq!(list.status(), StatusCode::OK);
    }

    #[test]
    fn forbidden_is_empty() {
        let res = forbidden();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert!(res.headers().get(axum::http::header::CONTENT_TYPE).is_none());
    }
}
