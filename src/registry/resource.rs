//! Registered resources: exposed field projection and allowed HTTP verbs.

use crate::error::RegistryError;
use crate::registry::ModelSchema;
use crate::store::Record;
use axum::http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// HTTP verbs a resource can allow. Anything else is always refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
        }
    }

    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(HttpVerb::Get),
            Method::POST => Some(HttpVerb::Post),
            Method::PUT => Some(HttpVerb::Put),
            Method::DELETE => Some(HttpVerb::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpVerb {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpVerb::Get),
            "POST" => Ok(HttpVerb::Post),
            "PUT" => Ok(HttpVerb::Put),
            "DELETE" => Ok(HttpVerb::Delete),
            _ => Err(RegistryError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Registration options. Unset fields fall back to all declared fields and `[GET]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExposeOptions {
    pub fields: Option<Vec<String>>,
    pub allowed_methods: Option<Vec<HttpVerb>>,
}

impl ExposeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn allowed_methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = HttpVerb>,
    {
        self.allowed_methods = Some(methods.into_iter().collect());
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    pub schema: ModelSchema,
    /// Exposed field names, in response order. Never empty.
    pub fields: Vec<String>,
    pub allowed_methods: Vec<HttpVerb>,
}

impl Resource {
    /// Resource name; the model's table name.
    pub fn name(&self) -> &str {
        self.schema.table()
    }

    pub fn allows(&self, verb: HttpVerb) -> bool {
        self.allowed_methods.contains(&verb)
    }

    /// False for any method outside GET/POST/PUT/DELETE.
    pub fn allows_method(&self, method: &Method) -> bool {
        HttpVerb::from_method(method).is_some_and(|v| self.allows(v))
    }

    pub fn is_exposed(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Restrict a record to the exposed fields, in exposed order. Missing fields project as null.
    pub fn project(&self, record: &Record) -> Record {
        self.fields
            .iter()
            .map(|f| (f.clone(), record.get(f).cloned().unwrap_or(Value::Null)))
            .collect()
    }

    /// Keep only submitted fields that are exposed and writable (the primary key never is),
    /// coerced to their declared kinds.
    pub fn writable_changes<I>(&self, submitted: I) -> Result<Record, String>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let pk = &self.schema.primary_key().name;
        let mut out = Record::new();
        for (name, value) in submitted {
            if name == *pk || !self.is_exposed(&name) {
                continue;
            }
            let Some(def) = self.schema.get_field(&name) else { continue };
            out.insert(name, def.coerce(value)?);
        }
        Ok(out)
    }
}
