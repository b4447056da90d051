//! Schema discovery: from a record's field declarations to its resolved schema.
//!
//! A [`Declaration`] is the ordered list of `(field name, type text)` pairs a
//! record provides, either captured at compile time by [`record!`](crate::record!)
//! or loaded from a declaration file. Walking it resolves every type text
//! against the enclosing scope.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DiscoveryError, Error, Result};
use crate::ir::{FieldSchema, Schema};
use crate::resolve::{resolve, Scope};

static FIELD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{XID_Start}_]\p{XID_Continue}*$").expect("field name pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub type_expr: String,
}

/// On-disk form: `{ "records": [ { "name": .., "fields": [ { "name": .., "type": .. } ] } ] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclarationFile {
    pub records: Vec<Declaration>,
}

impl Declaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new() }
    }

    pub fn field(mut self, name: impl Into<String>, type_expr: impl Into<String>) -> Self {
        self.fields.push(FieldDecl { name: name.into(), type_expr: type_expr.into() });
        self
    }
}

impl DeclarationFile {
    pub fn from_slice(bytes: &[u8]) -> std::result::Result<Self, String> {
        crate::path_de::from_slice_with_path(bytes)
    }
}

/// Walk `decl` in order and resolve each field type against `scope`.
pub fn discover_schema<S: Scope + ?Sized>(decl: &Declaration, scope: &S) -> Result<Schema> {
    let mut seen = HashSet::with_capacity(decl.fields.len());
    let mut fields = Vec::with_capacity(decl.fields.len());

    for field in &decl.fields {
        let name = field.name.strip_prefix("r#").unwrap_or(&field.name);
        if !FIELD_NAME.is_match(name) {
            return Err(Error::discovery(
                &decl.name,
                DiscoveryError::InvalidFieldName(field.name.clone()),
            ));
        }
        if !seen.insert(name) {
            return Err(Error::discovery(&decl.name, DiscoveryError::DuplicateField(name.to_string())));
        }
        let ty = resolve(&field.type_expr, scope).map_err(|source| {
            Error::discovery(
                &decl.name,
                DiscoveryError::Field { field: name.to_string(), source: Box::new(source) },
            )
        })?;
        fields.push(FieldSchema { name: name.to_string(), ty });
    }

    debug!(record = %decl.name, fields = fields.len(), "discovered schema");
    Ok(Schema { record: decl.name.clone(), fields })
}
