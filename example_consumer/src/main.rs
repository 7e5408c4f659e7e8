//! Example consumer: serves registered models over HTTP.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Without `DATABASE_URL` the in-memory store is used and a sample `notes_note` resource is exposed;
//! set `RESTROOM_MANIFEST` to expose resources from a JSON manifest instead.

use restroom::{
    app_router, load_manifest, register_manifest, AppState, FieldKind, HttpVerb, MemoryStore, ModelSchema,
    PgStore, Registry, ServerSettings, Store,
};
use std::sync::Arc;
use tokio::net::TcpListener;

fn sample_registry() -> Result<Registry, restroom::RegistryError> {
    let mut registry = Registry::new();
    registry
        .expose(
            ModelSchema::new("notes_note")
                .field("text", FieldKind::Text)
                .nullable_field("slug", FieldKind::Text),
        )
        .allowed_methods([HttpVerb::Get, HttpVerb::Post, HttpVerb::Put, HttpVerb::Delete])
        .register()?;
    Ok(registry)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("restroom=info,example_consumer=info")),
        )
        .init();

    let settings = ServerSettings::from_env()?;

    let registry = match &settings.manifest {
        Some(path) => {
            let manifest = load_manifest(path).await?;
            let mut registry = Registry::new();
            register_manifest(&mut registry, &manifest)?;
            registry
        }
        None => sample_registry()?,
    };

    let store: Arc<dyn Store> = match &settings.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await?;
            let store = PgStore::new(pool);
            match &settings.pg_schema {
                Some(schema) => Arc::new(store.with_schema(schema.clone())),
                None => Arc::new(store),
            }
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(registry, store);
    state.verify_store().await?;
    tracing::info!(resources = state.registry.len(), "registry ready");

    let app = app_router(state, settings.body_limit);
    let listener = TcpListener::bind(settings.bind.as_str()).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
