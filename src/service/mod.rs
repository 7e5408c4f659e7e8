//! CrudService: resource-level CRUD on top of a [`Store`](crate::store::Store).

mod crud;
pub use crud::{deletion_payload, not_found_payload, parse_id, CrudService};
