//! Manifest types: resources declared in JSON instead of code.

use crate::registry::FieldDef;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub table: String,
    /// Declared fields besides the implicit integer `id`.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Exposed subset; all declared fields when absent.
    #[serde(default)]
    pub exposed_fields: Option<Vec<String>>,
    /// Verb names, case-insensitive; `["GET"]` when absent.
    #[serde(default)]
    pub allowed_methods: Option<Vec<String>>,
}
