//! Load a manifest from disk and register its resources.

use crate::config::types::{Manifest, ResourceConfig};
use crate::error::{ConfigError, RegistryError};
use crate::registry::{ExposeOptions, HttpVerb, ModelSchema, Registry, PRIMARY_KEY};
use std::collections::HashSet;
use std::path::Path;

pub async fn load_manifest(path: &Path) -> Result<Manifest, ConfigError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_manifest(&raw)
}

pub fn parse_manifest(raw: &str) -> Result<Manifest, ConfigError> {
    serde_json::from_str(raw).map_err(|e| ConfigError::Load(e.to_string()))
}

fn schema_of(config: &ResourceConfig) -> Result<ModelSchema, RegistryError> {
    let mut seen = HashSet::new();
    let mut schema = ModelSchema::new(config.table.clone());
    for f in &config.fields {
        if f.name == PRIMARY_KEY || !seen.insert(f.name.as_str()) {
            return Err(RegistryError::DuplicateField {
                table: config.table.clone(),
                field: f.name.clone(),
            });
        }
        schema = schema.field_def(f.clone());
    }
    Ok(schema)
}

fn options_of(config: &ResourceConfig) -> Result<ExposeOptions, RegistryError> {
    let allowed_methods = config
        .allowed_methods
        .as_ref()
        .map(|methods| {
            methods
                .iter()
                .map(|m| m.parse::<HttpVerb>())
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;
    Ok(ExposeOptions {
        fields: config.exposed_fields.clone(),
        allowed_methods,
    })
}

/// Register every manifest resource into `registry`, in manifest order.
pub fn register_manifest(registry: &mut Registry, manifest: &Manifest) -> Result<(), ConfigError> {
    for config in &manifest.resources {
        registry.register(schema_of(config)?, options_of(config)?)?;
    }
    Ok(())
}
