//! Restroom: automatic REST endpoints for registered models.
//!
//! Register model schemas in a [`Registry`], hand it to [`AppState`] together with a [`Store`],
//! and mount [`app_router`]. Each resource gets a collection endpoint and a single-record
//! endpoint whose verbs and exposed fields follow its registration.

pub mod config;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod registry;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{load_manifest, parse_manifest, register_manifest, Manifest, ServerSettings};
pub use error::{AppError, ConfigError, RegistryError};
pub use filter::{Filter, Lookup};
pub use registry::{ExposeOptions, FieldDef, FieldKind, HttpVerb, Model, ModelSchema, Registry, Resource};
pub use routes::{app_router, common_routes, resource_routes};
pub use service::CrudService;
pub use state::AppState;
pub use store::{MemoryStore, PgStore, Record, Store};
