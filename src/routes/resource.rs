//! Per-resource routes built from the registry: `/<table>/` and `/<table>/:id/`, trailing slash optional.

use crate::handlers::{detail_view, list_view, ViewState};
use crate::state::AppState;
use axum::{routing::any, Router};

pub fn resource_routes(state: &AppState) -> Router {
    let mut router = Router::new();
    for resource in state.registry.iter() {
        let view = ViewState {
            resource: resource.clone(),
            store: state.store.clone(),
        };
        let base = format!("/{}", resource.name());
        router = router
            .route(&base, any(list_view).with_state(view.clone()))
            .route(&format!("{}/", base), any(list_view).with_state(view.clone()))
            .route(&format!("{}/:id", base), any(detail_view).with_state(view.clone()))
            .route(&format!("{}/:id/", base), any(detail_view).with_state(view));
    }
    router
}
