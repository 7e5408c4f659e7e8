use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use restroom::{
    app_router, resource_routes, AppError, AppState, ExposeOptions, FieldKind, Filter, HttpVerb, MemoryStore,
    ModelSchema, Record, Registry, Store,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

/// MemoryStore that counts every call, to prove refused requests never reach storage.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
}

impl CountingStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for CountingStore {
    async fn check_schema(&self, schema: &ModelSchema) -> Result<(), AppError> {
        self.inner.check_schema(schema).await
    }

    async fn filter(&self, schema: &ModelSchema, filter: &Filter) -> Result<Vec<Record>, AppError> {
        self.tick();
        self.inner.filter(schema, filter).await
    }

    async fn get(&self, schema: &ModelSchema, id: i64) -> Result<Option<Record>, AppError> {
        self.tick();
        self.inner.get(schema, id).await
    }

    async fn create(&self, schema: &ModelSchema, values: &Record) -> Result<Record, AppError> {
        self.tick();
        self.inner.create(schema, values).await
    }

    async fn update(&self, schema: &ModelSchema, id: i64, changes: &Record) -> Result<Option<Record>, AppError> {
        self.tick();
        self.inner.update(schema, id, changes).await
    }

    async fn update_where(
        &self,
        schema: &ModelSchema,
        filter: &Filter,
        changes: &Record,
    ) -> Result<Vec<Record>, AppError> {
        self.tick();
        self.inner.update_where(schema, filter, changes).await
    }

    async fn delete(&self, schema: &ModelSchema, id: i64) -> Result<bool, AppError> {
        self.tick();
        self.inner.delete(schema, id).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.inner.ping().await
    }
}

fn my_model() -> ModelSchema {
    ModelSchema::new("table_mymodel").field("text", FieldKind::Text)
}

struct Harness {
    app: Router,
    store: Arc<CountingStore>,
    state: AppState,
}

impl Harness {
    async fn new(methods: &[HttpVerb]) -> Self {
        let mut registry = Registry::new();
        registry
            .register(my_model(), ExposeOptions::new().allowed_methods(methods.iter().copied()))
            .unwrap();
        Self::with_registry(registry).await
    }

    async fn with_registry(registry: Registry) -> Self {
        let store = Arc::new(CountingStore::default());
        let state = AppState::new(registry, store.clone());
        state.verify_store().await.unwrap();
        Harness {
            app: resource_routes(&state),
            store,
            state,
        }
    }

    /// Insert directly through the store, bypassing the HTTP layer and the call counter.
    async fn seed(&self, table: &str, values: Value) -> Record {
        let resource = self.state.registry.get(table).unwrap();
        self.store
            .inner
            .create(&resource.schema, values.as_object().unwrap())
            .await
            .unwrap()
    }

    async fn send(&self, method: &str, uri: &str, form: Option<&str>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match form {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(&self, method: &str, uri: &str, form: Option<&str>) -> (StatusCode, Value) {
        let (status, body) = self.send(method, uri, form).await;
        (status, serde_json::from_slice(&body).unwrap())
    }
}

#[tokio::test]
async fn list_get_returns_projected_rows() {
    let h = Harness::new(&[HttpVerb::Get]).await;
    h.seed("table_mymodel", json!({"text": "Shalom"})).await;

    let (status, body) = h.send_json("GET", "/table_mymodel/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"id": 1, "text": "Shalom"}]));
}

#[tokio::test]
async fn list_get_when_not_allowed_is_forbidden_without_store_calls() {
    let h = Harness::new(&[HttpVerb::Post]).await;
    let (status, body) = h.send("GET", "/table_mymodel/", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.is_empty());
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn list_post_creates_from_form_fields() {
    let h = Harness::new(&[HttpVerb::Get, HttpVerb::Post]).await;
    let (status, body) = h.send_json("POST", "/table_mymodel/", Some("text=Shalom")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"id": 1, "text": "Shalom"}));

    let (_, listed) = h.send_json("GET", "/table_mymodel/", None).await;
    assert_eq!(listed, json!([{"id": 1, "text": "Shalom"}]));
}

#[tokio::test]
async fn list_post_accepts_json_bodies() {
    let h = Harness::new(&[HttpVerb::Post]).await;
    let request = Request::builder()
        .method("POST")
        .uri("/table_mymodel")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"text": "Shalom"}"#))
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn list_post_when_not_allowed_creates_nothing() {
    let h = Harness::new(&[HttpVerb::Get]).await;
    let (status, body) = h.send("POST", "/table_mymodel/", Some("text=Shalom")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.is_empty());
    assert_eq!(h.store.calls(), 0);
    let (_, listed) = h.send_json("GET", "/table_mymodel/", None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn list_delete_is_forbidden_even_if_allowed() {
    for methods in [vec![HttpVerb::Get, HttpVerb::Post], vec![HttpVerb::Get, HttpVerb::Delete]] {
        let h = Harness::new(&methods).await;
        h.seed("table_mymodel", json!({"text": "Shalom"})).await;
        let (status, body) = h.send("DELETE", "/table_mymodel/", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.is_empty());
        assert_eq!(h.store.calls(), 0);
    }
}

#[tokio::test]
async fn methods_outside_the_verb_set_are_forbidden() {
    let h = Harness::new(&[HttpVerb::Get, HttpVerb::Post, HttpVerb::Put, HttpVerb::Delete]).await;
    let (status, _) = h.send("PATCH", "/table_mymodel/1/", Some("text=x")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn detail_get_returns_one_projected_row() {
    let h = Harness::new(&[HttpVerb::Get]).await;
    h.seed("table_mymodel", json!({"text": "Shalom"})).await;
    let (status, body) = h.send_json("GET", "/table_mymodel/1/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 1, "text": "Shalom"}));

    let (status, _) = h.send_json("GET", "/table_mymodel/1", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn detail_get_for_missing_id_returns_error_payload() {
    let h = Harness::new(&[HttpVerb::Get]).await;
    let (status, body) = h.send("GET", "/table_mymodel/1/", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        serde_json::from_slice::<Value>(&body).unwrap(),
        json!({"error": "no matching object found for id: 1"})
    );

    let (status, body) = h.send_json("GET", "/table_mymodel/abc/", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "no matching object found for id: abc"}));
}

#[tokio::test]
async fn detail_get_when_not_allowed_is_forbidden() {
    let h = Harness::new(&[HttpVerb::Post, HttpVerb::Put, HttpVerb::Delete]).await;
    h.seed("table_mymodel", json!({"text": "Shalom"})).await;
    let (status, body) = h.send("GET", "/table_mymodel/1/", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.is_empty());
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn detail_delete_removes_the_row() {
    let h = Harness::new(&[HttpVerb::Get, HttpVerb::Post, HttpVerb::Delete]).await;
    h.seed("table_mymodel", json!({"text": "Shalom"})).await;

    let (status, body) = h.send_json("DELETE", "/table_mymodel/1/", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, json!({"status": "deletion successful"}));

    let (status, body) = h.send_json("GET", "/table_mymodel/1/", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "no matching object found for id: 1"}));
}

#[tokio::test]
async fn detail_delete_when_not_allowed_touches_nothing() {
    let h = Harness::new(&[HttpVerb::Get, HttpVerb::Post]).await;
    h.seed("table_mymodel", json!({"text": "Shalom"})).await;
    let (status, body) = h.send("DELETE", "/table_mymodel/1/", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.is_empty());
    assert_eq!(h.store.calls(), 0);

    let (status, _) = h.send("GET", "/table_mymodel/1/", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn detail_post_is_forbidden_even_if_allowed() {
    for methods in [vec![HttpVerb::Get], vec![HttpVerb::Get, HttpVerb::Post]] {
        let h = Harness::new(&methods).await;
        let (status, body) = h.send("POST", "/table_mymodel/1/", Some("text=Shalom")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.is_empty());
        assert_eq!(h.store.calls(), 0);
    }
}

#[tokio::test]
async fn detail_put_updates_and_returns_projection() {
    let h = Harness::new(&[HttpVerb::Get, HttpVerb::Post, HttpVerb::Put]).await;
    h.seed("table_mymodel", json!({"text": "Shalom"})).await;
    let (status, body) = h.send_json("PUT", "/table_mymodel/1/", Some("text=Hello")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"id": 1, "text": "Hello"}));

    let (_, body) = h.send_json("GET", "/table_mymodel/1/", None).await;
    assert_eq!(body, json!({"id": 1, "text": "Hello"}));
}

#[tokio::test]
async fn detail_put_when_not_allowed_is_forbidden() {
    let h = Harness::new(&[HttpVerb::Get, HttpVerb::Post]).await;
    h.seed("table_mymodel", json!({"text": "Shalom"})).await;
    let (status, body) = h.send("PUT", "/table_mymodel/1/", Some("text=Hello")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.is_empty());
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn detail_put_for_missing_id_returns_error_payload() {
    let h = Harness::new(&[HttpVerb::Put]).await;
    let (status, body) = h.send_json("PUT", "/table_mymodel/3/", Some("text=Hello")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "no matching object found for id: 3"}));
}

fn article_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .expose(
            ModelSchema::new("restroom_article")
                .field("short_title", FieldKind::Text)
                .field_def(restroom::FieldDef::new("expired", FieldKind::Boolean).with_default())
                .field("author", FieldKind::Text)
                .field_def(restroom::FieldDef::new("status", FieldKind::Integer).with_default()),
        )
        .fields(["short_title", "author", "id"])
        .allowed_methods([HttpVerb::Get, HttpVerb::Post, HttpVerb::Put])
        .register()
        .unwrap();
    registry
}

#[tokio::test]
async fn responses_only_carry_exposed_fields() {
    let h = Harness::with_registry(article_registry()).await;
    let (status, body) = h
        .send_json(
            "POST",
            "/restroom_article/",
            Some("short_title=This+is+a+short+title&author=Edgar+Allen+Poe&status=7"),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!({"short_title": "This is a short title", "author": "Edgar Allen Poe", "id": 1})
    );

    // `status` was not exposed, so the submitted value never reached storage.
    let stored = h.seed("restroom_article", json!({"short_title": "b", "author": "c"})).await;
    assert_eq!(stored["status"], json!(0));
    let resource = h.state.registry.get("restroom_article").unwrap();
    let first = h.store.inner.get(&resource.schema, 1).await.unwrap().unwrap();
    assert_eq!(first["status"], json!(0));
}

#[tokio::test]
async fn list_get_applies_q_filter() {
    let h = Harness::with_registry(article_registry()).await;
    h.seed("restroom_article", json!({"short_title": "The Raven", "author": "Poe"})).await;
    h.seed("restroom_article", json!({"short_title": "Ulalume", "author": "Poe"})).await;
    h.seed("restroom_article", json!({"short_title": "Dracula", "author": "Stoker"})).await;

    // [{"author":"Poe"},{"short_title__icontains":"raven"}]
    let uri = "/restroom_article/?q=%5B%7B%22author%22%3A%22Poe%22%7D%2C%7B%22short_title__icontains%22%3A%22raven%22%7D%5D";
    let (status, body) = h.send_json("GET", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{"short_title": "The Raven", "author": "Poe", "id": 1}])
    );
}

#[tokio::test]
async fn malformed_q_is_a_bad_request() {
    let h = Harness::with_registry(article_registry()).await;
    let (status, body) = h.send_json("GET", "/restroom_article/?q=%5B%7B", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("bad_filter"));
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn collection_put_bulk_updates_matching_rows() {
    let h = Harness::with_registry(article_registry()).await;
    h.seed("restroom_article", json!({"short_title": "The Raven", "author": "Poe"})).await;
    h.seed("restroom_article", json!({"short_title": "Dracula", "author": "Stoker"})).await;
    h.seed("restroom_article", json!({"short_title": "Ulalume", "author": "Poe"})).await;

    // q=[{"author":"Poe"}]
    let form = "q=%5B%7B%22author%22%3A%22Poe%22%7D%5D&author=E.+A.+Poe";
    let (status, body) = h.send_json("PUT", "/restroom_article/", Some(form)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!([
            {"short_title": "The Raven", "author": "E. A. Poe", "id": 1},
            {"short_title": "Ulalume", "author": "E. A. Poe", "id": 3}
        ])
    );

    let (_, body) = h.send_json("GET", "/restroom_article/2/", None).await;
    assert_eq!(body["author"], json!("Stoker"));
}

#[tokio::test]
async fn app_router_mounts_common_and_resource_routes() {
    let mut registry = Registry::new();
    registry.register(my_model(), ExposeOptions::default()).unwrap();
    let state = AppState::new(registry, Arc::new(MemoryStore::new()));
    state.verify_store().await.unwrap();
    let app = app_router(state, 1024);

    for uri in ["/health", "/ready", "/version", "/api/table_mymodel/"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }
}

#[tokio::test]
async fn refused_verb_wins_over_an_undecodable_id() {
    let h = Harness::new(&[HttpVerb::Get]).await;
    let (status, body) = h.send("DELETE", "/table_mymodel/%FF/", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.is_empty());
    assert_eq!(h.store.calls(), 0);

    let (status, body) = h.send_json("GET", "/table_mymodel/%FF/", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("bad_request"));
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn collection_put_when_not_allowed_is_forbidden() {
    let h = Harness::new(&[HttpVerb::Get, HttpVerb::Post]).await;
    h.seed("table_mymodel", json!({"text": "Shalom"})).await;
    let (status, body) = h.send("PUT", "/table_mymodel/", Some("text=Hello")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.is_empty());
    assert_eq!(h.store.calls(), 0);

    let (_, listed) = h.send_json("GET", "/table_mymodel/", None).await;
    assert_eq!(listed, json!([{"id": 1, "text": "Shalom"}]));
}

#[tokio::test]
async fn collection_put_takes_q_from_a_json_body() {
    let h = Harness::with_registry(article_registry()).await;
    h.seed("restroom_article", json!({"short_title": "The Raven", "author": "Poe"})).await;
    h.seed("restroom_article", json!({"short_title": "Dracula", "author": "Stoker"})).await;
    h.seed("restroom_article", json!({"short_title": "Ulalume", "author": "Poe"})).await;

    let request = Request::builder()
        .method("PUT")
        .uri("/restroom_article/")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"q": [{"author": "Poe"}], "author": "X"}"#))
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body,
        json!([
            {"short_title": "The Raven", "author": "X", "id": 1},
            {"short_title": "Ulalume", "author": "X", "id": 3}
        ])
    );

    let (_, listed) = h.send_json("GET", "/restroom_article/", None).await;
    let authors: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["author"].as_str())
        .collect();
    assert_eq!(authors, vec!["X", "Stoker", "X"]);
}

#[tokio::test]
async fn detail_put_to_missing_id_reports_not_found_before_bad_values() {
    let mut registry = Registry::new();
    registry
        .expose(ModelSchema::new("app_counter").field("count", FieldKind::Integer))
        .allowed_methods([HttpVerb::Put])
        .register()
        .unwrap();
    let h = Harness::with_registry(registry).await;
    let (status, body) = h.send_json("PUT", "/app_counter/4/", Some("count=many")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "no matching object found for id: 4"}));
}
