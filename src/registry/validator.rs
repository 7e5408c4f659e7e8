//! Registration validation: identifiers and exposed fields against the declared schema.

use crate::error::RegistryError;
use crate::registry::{ExposeOptions, FieldKind, HttpVerb, ModelSchema, PRIMARY_KEY};
use regex::Regex;
use std::sync::OnceLock;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("static pattern"))
}

/// Table and field names end up quoted in SQL and in route paths; only plain identifiers are accepted.
pub fn validate_identifier(name: &str) -> Result<(), RegistryError> {
    if identifier_re().is_match(name) {
        Ok(())
    } else {
        Err(RegistryError::InvalidIdentifier(name.to_string()))
    }
}

pub fn validate_schema(schema: &ModelSchema) -> Result<(), RegistryError> {
    validate_identifier(schema.table())?;
    let pk = schema.primary_key();
    if pk.name != PRIMARY_KEY || pk.kind != FieldKind::Integer {
        return Err(RegistryError::InvalidPrimaryKey {
            table: schema.table().to_string(),
            field: pk.name.clone(),
        });
    }
    for f in schema.fields() {
        validate_identifier(&f.name)?;
    }
    Ok(())
}

/// Resolve options to the stored (fields, verbs) pair.
/// Fields default to every declared field (id first); an empty list is treated as unset.
/// Verbs default to `[GET]`; an explicit empty list allows nothing. Duplicates collapse, first wins.
pub fn resolve_options(
    schema: &ModelSchema,
    options: ExposeOptions,
) -> Result<(Vec<String>, Vec<HttpVerb>), RegistryError> {
    let fields = match options.fields {
        Some(fields) if !fields.is_empty() => {
            let mut out: Vec<String> = Vec::with_capacity(fields.len());
            for f in fields {
                if schema.get_field(&f).is_none() {
                    return Err(RegistryError::UnknownField {
                        table: schema.table().to_string(),
                        field: f,
                    });
                }
                if !out.contains(&f) {
                    out.push(f);
                }
            }
            out
        }
        _ => schema.field_names(),
    };

    let methods = match options.allowed_methods {
        Some(methods) => {
            let mut out: Vec<HttpVerb> = Vec::with_capacity(methods.len());
            for m in methods {
                if !out.contains(&m) {
                    out.push(m);
                }
            }
            out
        }
        None => vec![HttpVerb::Get],
    };

    Ok((fields, methods))
}
