//! Shared application state: the registry (immutable once serving starts) and the store.

use crate::error::AppError;
use crate::registry::Registry;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(registry: Registry, store: Arc<dyn Store>) -> Self {
        AppState {
            registry: Arc::new(registry),
            store,
        }
    }

    /// Check every registered schema against storage. Run once before serving.
    pub async fn verify_store(&self) -> Result<(), AppError> {
        for resource in self.registry.iter() {
            self.store.check_schema(&resource.schema).await?;
            tracing::debug!(table = %resource.name(), "schema verified");
        }
        Ok(())
    }
}
