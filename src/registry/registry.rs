//! Table name → resource mapping, populated once before serving.

use crate::error::RegistryError;
use crate::registry::{
    resolve_options, validate_schema, ExposeOptions, HttpVerb, Model, ModelSchema, Resource,
};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct Registry {
    resources: BTreeMap<String, Arc<Resource>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model under its table name. Registering the same table again replaces the entry.
    pub fn register(
        &mut self,
        schema: ModelSchema,
        options: ExposeOptions,
    ) -> Result<Arc<Resource>, RegistryError> {
        validate_schema(&schema)?;
        let (fields, allowed_methods) = resolve_options(&schema, options)?;
        let table = schema.table().to_string();
        tracing::info!(
            table = %table,
            fields = ?fields,
            allowed_methods = ?allowed_methods,
            "registered resource"
        );
        let resource = Arc::new(Resource {
            schema,
            fields,
            allowed_methods,
        });
        if self.resources.insert(table.clone(), resource.clone()).is_some() {
            tracing::debug!(table = %table, "replaced existing registration");
        }
        Ok(resource)
    }

    pub fn register_model<M: Model>(
        &mut self,
        options: ExposeOptions,
    ) -> Result<Arc<Resource>, RegistryError> {
        self.register(M::schema(), options)
    }

    /// Start a fluent registration, applied right after the schema is declared.
    pub fn expose(&mut self, schema: ModelSchema) -> Exposer<'_> {
        Exposer {
            registry: self,
            schema,
            options: ExposeOptions::default(),
        }
    }

    pub fn get(&self, table: &str) -> Result<&Arc<Resource>, RegistryError> {
        self.resources
            .get(table)
            .ok_or_else(|| RegistryError::NotFound(table.to_string()))
    }

    /// Resources in table-name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Builder returned by [`Registry::expose`].
pub struct Exposer<'a> {
    registry: &'a mut Registry,
    schema: ModelSchema,
    options: ExposeOptions,
}

impl<'a> Exposer<'a> {
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = self.options.fields(fields);
        self
    }

    pub fn allowed_methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = HttpVerb>,
    {
        self.options = self.options.allowed_methods(methods);
        self
    }

    pub fn register(self) -> Result<Arc<Resource>, RegistryError> {
        self.registry.register(self.schema, self.options)
    }
}
