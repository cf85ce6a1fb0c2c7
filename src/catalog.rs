//! The bundled DSL schema: every operator, action, filter and facet shape a
//! request may use, as a schema document (`schemas/dsl.json`).
//!
//! The catalog is built once, on first use, and shared afterwards.

use lazy_static::lazy_static;
use serde_json::Value;

use crate::error::{CairnError, Result};
use crate::request::RequestKind;
use crate::schema::Schema;
use crate::validator::{ValidationReport, Validator};

pub const DSL_SCHEMA: &str = include_str!("../schemas/dsl.json");

lazy_static! {
    static ref DSL: std::result::Result<Schema, String> = Schema::parse(DSL_SCHEMA).map_err(|e| e.to_string());
}

/// The bundled catalog.
pub fn dsl_schema() -> Result<&'static Schema> {
    DSL.as_ref().map_err(|e| CairnError::Schema(format!("bundled catalog: {e}")))
}

/// Name of the catalog type describing a request of `kind`.
pub fn root_type(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::Select => "SELECT",
        RequestKind::Insert => "INSERT",
        RequestKind::Update => "UPDATE",
        RequestKind::Delete => "DELETE",
    }
}

/// Validates a request envelope against the catalog.
pub fn validate_request(kind: RequestKind, request: &Value) -> Result<()> {
    Validator::new(dsl_schema()?).validate(root_type(kind), request)
}

/// Every violation of `document` against the catalog type `type_name`.
pub fn report(type_name: &str, document: &Value) -> Result<ValidationReport> {
    Validator::new(dsl_schema()?).report(type_name, document)
}
