//! Resource registry: which models are exposed, with which fields and verbs.

mod registry;
mod resource;
mod schema;
mod validator;

pub use registry::{Exposer, Registry};
pub use resource::{ExposeOptions, HttpVerb, Resource};
pub use schema::{FieldDef, FieldKind, Model, ModelSchema, PRIMARY_KEY};
pub use validator::{resolve_options, validate_identifier, validate_schema};
