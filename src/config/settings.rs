//! Server settings from the environment (`.env` is loaded by the binary via dotenvy).

use crate::error::ConfigError;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Debug, PartialEq)]
pub struct ServerSettings {
    /// `DATABASE_URL`; the in-memory store is used when unset.
    pub database_url: Option<String>,
    /// `RESTROOM_PG_SCHEMA`: schema qualifying exposed tables.
    pub pg_schema: Option<String>,
    /// `RESTROOM_BIND`.
    pub bind: String,
    /// `RESTROOM_MANIFEST`: JSON manifest of resources to expose.
    pub manifest: Option<PathBuf>,
    /// `RESTROOM_BODY_LIMIT`, in bytes.
    pub body_limit: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            database_url: None,
            pg_schema: None,
            bind: DEFAULT_BIND.to_string(),
            manifest: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ServerSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let body_limit = match get("RESTROOM_BODY_LIMIT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "RESTROOM_BODY_LIMIT",
                value: v,
            })?,
            None => DEFAULT_BODY_LIMIT,
        };
        Ok(ServerSettings {
            database_url: get("DATABASE_URL"),
            pg_schema: get("RESTROOM_PG_SCHEMA"),
            bind: get("RESTROOM_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            manifest: get("RESTROOM_MANIFEST").map(PathBuf::from),
            body_limit,
        })
    }
}
