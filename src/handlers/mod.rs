//! HTTP handlers for the collection (`/<resource>/`) and single-record (`/<resource>/<id>/`) endpoints.

pub mod body;
mod detail;
mod list;

pub use detail::detail_view;
pub use list::list_view;

use crate::registry::{HttpVerb, Resource};
use crate::store::Store;
use axum::http::Method;
use std::sync::Arc;

/// Per-resource handler state, built from the registry when routes are constructed.
#[derive(Clone)]
pub struct ViewState {
    pub resource: Arc<Resource>,
    pub store: Arc<dyn Store>,
}

impl ViewState {
    /// The verb to dispatch on, or `None` when the resource does not allow this method.
    pub fn permit(&self, method: &Method) -> Option<HttpVerb> {
        if self.resource.allows_method(method) {
            HttpVerb::from_method(method)
        } else {
            tracing::warn!(resource = %self.resource.name(), method = %method, "method not allowed");
            None
        }
    }
}
