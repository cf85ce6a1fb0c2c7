//! Structural validation of JSON documents against a [`Schema`].
//!
//! The walk never stops at the first problem: every violation found is
//! collected in a [`ValidationReport`].

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{CairnError, Result};
use crate::schema::{FormatId, FormatKind, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Scalar of the wrong type, or outside its domain.
    InvalidValue,
    /// Unknown key, or a keyed alternative whose value is invalid.
    InvalidJsonField,
    /// Object or array expected, something else found.
    WrongJsonType,
    ElementTooShort,
    ElementTooLong,
    /// Required field missing.
    Mandatory,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidValue => "INVALID_VALUE",
            ErrorKind::InvalidJsonField => "INVALID_JSON_FIELD",
            ErrorKind::WrongJsonType => "WRONG_JSON_TYPE",
            ErrorKind::ElementTooShort => "ELEMENT_TOO_SHORT",
            ErrorKind::ElementTooLong => "ELEMENT_TOO_LONG",
            ErrorKind::Mandatory => "MANDATORY",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub path: Vec<String>,
    pub expected: String,
    pub kind: ErrorKind,
    pub info: String,
    pub found: Value,
}

impl ValidationError {
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "(root)".to_string() } else { self.dotted_path() };
        write!(
            f,
            "{} ~ {}: {} ~ found json: {} ~ path: {}",
            self.expected, self.kind, self.info, self.found, path
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
    pub fn len(&self) -> usize {
        self.errors.len()
    }
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "Validating: {error}")?;
        }
        Ok(())
    }
}

/// JSON kind names as they appear in reports.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Bool(_) => "BOOLEAN",
        Value::Number(_) => "NUMBER",
        Value::String(_) => "STRING",
        Value::Array(_) => "ARRAY",
        Value::Object(_) => "OBJECT",
    }
}

pub struct Validator<'s> {
    schema: &'s Schema,
}

impl<'s> Validator<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    /// Validates `document` as an instance of the type named `root_type`.
    pub fn validate(&self, root_type: &str, document: &Value) -> Result<()> {
        let report = self.report(root_type, document)?;
        if report.is_empty() { Ok(()) } else { Err(CairnError::Validation(report)) }
    }

    /// Every violation of `document`; an empty report means valid.
    pub fn report(&self, root_type: &str, document: &Value) -> Result<ValidationReport> {
        let root = self
            .schema
            .lookup(root_type)
            .ok_or_else(|| CairnError::Schema(format!("unknown root type {root_type}")))?;
        let mut walk = Walk { schema: self.schema, path: Vec::new(), errors: Vec::new() };
        walk.check(root, document);
        Ok(ValidationReport { errors: walk.errors })
    }
}

/// Validates `document` against `root_type` of `schema`.
pub fn validate(schema: &Schema, root_type: &str, document: &Value) -> Result<()> {
    Validator::new(schema).validate(root_type, document)
}

// state of one validation walk
struct Walk<'s> {
    schema: &'s Schema,
    path: Vec<String>,
    errors: Vec<ValidationError>,
}

impl Walk<'_> {
    fn push(&mut self, id: FormatId, kind: ErrorKind, info: String, found: &Value) {
        self.errors.push(ValidationError {
            path: self.path.clone(),
            expected: self.schema.signature(id).to_string(),
            kind,
            info,
            found: found.clone(),
        });
    }

    fn nested(&mut self, segment: &str, id: FormatId, value: &Value) {
        self.path.push(segment.to_string());
        self.check(id, value);
        self.path.pop();
    }

    fn check_count(&mut self, id: FormatId, len: usize, min: Option<usize>, max: Option<usize>, found: &Value) {
        if let Some(min) = min.filter(|min| len < *min) {
            self.push(id, ErrorKind::ElementTooShort, format!("{len} elements, at least {min} expected"), found);
        }
        if let Some(max) = max.filter(|max| len > *max) {
            self.push(id, ErrorKind::ElementTooLong, format!("{len} elements, at most {max} expected"), found);
        }
    }

    fn check(&mut self, id: FormatId, value: &Value) {
        let schema = self.schema;
        match schema.format(id).kind() {
            FormatKind::Alias(target) => self.check(*target, value),
            FormatKind::Scalar { scalar, domain } => {
                if !scalar.accepts(value) {
                    self.push(id, ErrorKind::InvalidValue, format!("{} found", json_kind(value)), value);
                } else if let Some(domain) = domain {
                    if !domain.contains(value) {
                        self.push(id, ErrorKind::InvalidValue, "value not allowed".to_string(), value);
                    }
                }
            }
            FormatKind::Array { element, min, max } => match value {
                Value::Array(items) => {
                    self.check_count(id, items.len(), *min, *max, value);
                    for (i, item) in items.iter().enumerate() {
                        self.nested(&i.to_string(), *element, item);
                    }
                }
                other => self.push(id, ErrorKind::WrongJsonType, format!("ARRAY expected, {} found", json_kind(other)), other),
            },
            FormatKind::Map { value: inner, min, max } => match value {
                Value::Object(map) => {
                    self.check_count(id, map.len(), *min, *max, value);
                    for (key, item) in map {
                        self.nested(key, *inner, item);
                    }
                }
                other => self.push(id, ErrorKind::WrongJsonType, format!("OBJECT expected, {} found", json_kind(other)), other),
            },
            FormatKind::Object { .. } | FormatKind::Choice { .. } | FormatKind::Union { .. } => match value {
                Value::Object(map) => {
                    let keys: Vec<&String> = map.keys().collect();
                    let unclaimed = self.check_keys(id, map, &keys);
                    for key in unclaimed {
                        self.unknown_field(id, key, &map[key.as_str()]);
                    }
                }
                other => self.push(id, ErrorKind::WrongJsonType, format!("OBJECT expected, {} found", json_kind(other)), other),
            },
            FormatKind::OneOf { alternatives } => self.check_one_of(id, alternatives, value),
        }
    }

    fn unknown_field(&mut self, id: FormatId, key: &str, found: &Value) {
        self.path.push(key.to_string());
        self.push(id, ErrorKind::InvalidJsonField, format!("unknown field {key}"), found);
        self.path.pop();
    }

    /// Checks the keys of `map` that format `id` claims, returns the others.
    fn check_keys<'k>(&mut self, id: FormatId, map: &Map<String, Value>, keys: &[&'k String]) -> Vec<&'k String> {
        let schema = self.schema;
        let id = schema.resolve(id);
        match schema.format(id).kind() {
            FormatKind::Object { fields, min, max } => {
                let mut present = 0;
                for field in fields {
                    match map.get(&field.name).filter(|_| keys.iter().any(|k| **k == field.name)) {
                        Some(item) => {
                            present += 1;
                            self.nested(&field.name, field.format, item);
                        }
                        None if field.required => {
                            self.path.push(field.name.clone());
                            self.push(id, ErrorKind::Mandatory, format!("{} is required", field.name), &Value::Null);
                            self.path.pop();
                        }
                        None => {}
                    }
                }
                self.check_count(id, present, *min, *max, &Value::Object(map.clone()));
                keys.iter().copied().filter(|k| !fields.iter().any(|f| f.name == **k)).collect()
            }
            FormatKind::Choice { choices, optional } => {
                let chosen: Vec<&(String, FormatId)> =
                    choices.iter().filter(|(name, _)| keys.iter().any(|k| *k == name)).collect();
                let expected: Vec<&str> = choices.iter().map(|(name, _)| name.as_str()).collect();
                if chosen.is_empty() && !optional {
                    self.push(id, ErrorKind::ElementTooShort, format!("one of {} expected", expected.join(", ")), &Value::Object(map.clone()));
                }
                if chosen.len() > 1 {
                    self.push(id, ErrorKind::ElementTooLong, format!("only one of {} expected", expected.join(", ")), &Value::Object(map.clone()));
                }
                for (name, format) in chosen {
                    let before = self.errors.len();
                    self.nested(name, *format, &map[name.as_str()]);
                    if self.errors.len() > before {
                        self.path.push(name.clone());
                        self.push(id, ErrorKind::InvalidJsonField, format!("invalid {name}"), &map[name.as_str()]);
                        self.path.pop();
                    }
                }
                keys.iter().copied().filter(|k| !choices.iter().any(|(name, _)| name == *k)).collect()
            }
            FormatKind::Union { members } => {
                // keyed members first, maps then take whatever is left
                let mut remaining: Vec<&'k String> = keys.to_vec();
                let mut maps = Vec::new();
                for member in members {
                    let resolved = schema.resolve(*member);
                    if matches!(schema.format(resolved).kind(), FormatKind::Map { .. }) {
                        maps.push(*member);
                    } else {
                        remaining = self.check_keys(*member, map, &remaining);
                    }
                }
                for member in maps {
                    let part: Map<String, Value> =
                        remaining.iter().map(|k| ((*k).clone(), map[k.as_str()].clone())).collect();
                    self.check(member, &Value::Object(part));
                    remaining.clear();
                }
                remaining
            }
            _ => {
                // a scalar or container member of a union sees the whole object
                self.check(id, &Value::Object(map.clone()));
                Vec::new()
            }
        }
    }

    fn check_one_of(&mut self, id: FormatId, alternatives: &[FormatId], value: &Value) {
        let mut shaped = Vec::new();
        for alternative in alternatives {
            let mut trial = Walk { schema: self.schema, path: self.path.clone(), errors: Vec::new() };
            trial.check(*alternative, value);
            if trial.errors.is_empty() {
                return;
            }
            if self.same_shape(*alternative, value) {
                shaped.push(trial.errors);
            }
        }
        match shaped.len() {
            1 => self.errors.extend(shaped.into_iter().flatten()),
            _ => self.push(id, ErrorKind::InvalidValue, format!("{} matches none of the alternatives", json_kind(value)), value),
        }
    }

    // whether the alternative expects the same kind of JSON container as found
    fn same_shape(&self, id: FormatId, value: &Value) -> bool {
        let schema = self.schema;
        match schema.format(schema.resolve(id)).kind() {
            FormatKind::Array { .. } => value.is_array(),
            FormatKind::Map { .. } | FormatKind::Object { .. } | FormatKind::Choice { .. } | FormatKind::Union { .. } => {
                value.is_object()
            }
            FormatKind::Scalar { scalar, .. } => scalar.accepts(value),
            FormatKind::OneOf { .. } | FormatKind::Alias(_) => false,
        }
    }
}
