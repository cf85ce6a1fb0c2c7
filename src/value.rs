//! Typed scalar operands.

use std::fmt;

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Number, Value};

use crate::error::{CairnError, Result};
use crate::token::DATE;

pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

lazy_static! {
    // "2015-03-21", "2015-03-21T10:11:12", "2015-03-21T10:11:12.345" with an optional trailing Z
    static ref DATE_SHAPE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}(T\d{2}:\d{2}(:\d{2}(\.\d+)?)?)?Z?$").unwrap();
}

/// Scalar operand of a comparison, membership or term predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDateTime),
}

impl Scalar {
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(Scalar::Bool(*b)),
            Value::Number(n) => number_scalar(n),
            Value::String(s) => Ok(Scalar::Str(s.clone())),
            Value::Object(map) if map.len() == 1 && map.contains_key(DATE) => match map.get(DATE) {
                Some(Value::String(text)) => Ok(Scalar::Date(parse_date(text)?)),
                _ => Err(CairnError::parse(format!("{DATE} expects a string, found {value}"))),
            },
            other => Err(CairnError::parse(format!("expected a scalar value, found {other}"))),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::from(*i),
            Scalar::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            Scalar::Str(s) => Value::String(s.clone()),
            Scalar::Date(d) => {
                let mut wrapper = Map::new();
                wrapper.insert(DATE.to_string(), Value::String(d.format(DATE_FORMAT).to_string()));
                Value::Object(wrapper)
            }
        }
    }

    /// Length used by the value sanity check.
    pub fn text_len(&self) -> usize {
        match self {
            Scalar::Str(s) => s.len(),
            _ => 0,
        }
    }
}

/// Integers must fit an `i64`; only non-integral numbers become floats.
fn number_scalar(n: &Number) -> Result<Scalar> {
    if let Some(i) = n.as_i64() {
        return Ok(Scalar::Int(i));
    }
    if n.is_u64() {
        return Err(CairnError::parse(format!("integer {n} is out of range")));
    }
    n.as_f64()
        .map(Scalar::Float)
        .ok_or_else(|| CairnError::parse(format!("number {n} is out of range")))
}

/// Parses the textual part of a `$date` scalar.
pub fn parse_date(text: &str) -> Result<NaiveDateTime> {
    if !DATE_SHAPE.is_match(text) {
        return Err(CairnError::parse(format!("invalid date: {text}")));
    }
    let trimmed = text.trim_end_matches('Z');
    let full = match trimmed.len() {
        10 => format!("{trimmed}T00:00:00"),
        16 => format!("{trimmed}:00"),
        _ => trimmed.to_string(),
    };
    NaiveDateTime::parse_from_str(&full, DATE_FORMAT).map_err(|e| CairnError::parse(format!("invalid date {text}: {e}")))
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self { Scalar::Bool(b) }
}
impl From<i64> for Scalar {
    fn from(i: i64) -> Self { Scalar::Int(i) }
}
impl From<i32> for Scalar {
    fn from(i: i32) -> Self { Scalar::Int(i64::from(i)) }
}
impl From<f64> for Scalar {
    fn from(f: f64) -> Self { Scalar::Float(f) }
}
impl From<&str> for Scalar {
    fn from(s: &str) -> Self { Scalar::Str(s.to_string()) }
}
impl From<String> for Scalar {
    fn from(s: String) -> Self { Scalar::Str(s) }
}
impl From<NaiveDateTime> for Scalar {
    fn from(d: NaiveDateTime) -> Self { Scalar::Date(d) }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Collects the keys of `value`, at any depth, for which `reject` holds.
pub(crate) fn find_keys<'a>(value: &'a Value, reject: &dyn Fn(&str) -> bool, found: &mut Vec<&'a str>) {
    match value {
        Value::Object(map) => scan_map(map, reject, found),
        Value::Array(items) => items.iter().for_each(|item| find_keys(item, reject, found)),
        _ => {}
    }
}

pub(crate) fn scan_map<'a>(map: &'a Map<String, Value>, reject: &dyn Fn(&str) -> bool, found: &mut Vec<&'a str>) {
    for (key, inner) in map {
        if reject(key) {
            found.push(key.as_str());
        }
        find_keys(inner, reject, found);
    }
}
