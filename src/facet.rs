//! Named aggregations attached to a select.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{CairnError, Result};
use crate::query::Predicate;
use crate::token::{self, FacetOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetOrder {
    Asc,
    Desc,
}

impl FacetOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacetOrder::Asc => "ASC",
            FacetOrder::Desc => "DESC",
        }
    }
    pub fn parse(order: &str) -> Option<Self> {
        match order {
            "ASC" => Some(FacetOrder::Asc),
            "DESC" => Some(FacetOrder::Desc),
            _ => None,
        }
    }
}

/// One bucket of a date range facet; at least one side is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateBucket {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FacetKind {
    Terms { field: String, size: u64, order: FacetOrder },
    DateRange { field: String, format: String, ranges: Vec<DateBucket> },
    Filters { filters: Vec<(String, Predicate)> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    name: String,
    kind: FacetKind,
}

impl Facet {
    pub fn new(name: &str, kind: FacetKind) -> Result<Self> {
        if name.is_empty() {
            return Err(CairnError::construction("a facet needs a name"));
        }
        match &kind {
            FacetKind::Terms { field, size, .. } => {
                if field.is_empty() || *size == 0 {
                    return Err(CairnError::construction(format!("terms facet {name} needs a field and a positive size")));
                }
            }
            FacetKind::DateRange { field, ranges, .. } => {
                if field.is_empty() || ranges.is_empty() {
                    return Err(CairnError::construction(format!("date range facet {name} needs a field and ranges")));
                }
                if ranges.iter().any(|r| r.from.is_none() && r.to.is_none()) {
                    return Err(CairnError::construction(format!("date range facet {name} has an unbounded range")));
                }
            }
            FacetKind::Filters { filters } => {
                if filters.is_empty() {
                    return Err(CairnError::construction(format!("filters facet {name} needs at least one filter")));
                }
                if filters.iter().any(|(filter_name, _)| filter_name.is_empty()) {
                    return Err(CairnError::construction(format!("filters facet {name} has an unnamed filter")));
                }
            }
        }
        Ok(Self { name: name.to_string(), kind })
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> &FacetKind {
        &self.kind
    }
    pub fn op(&self) -> FacetOp {
        match self.kind {
            FacetKind::Terms { .. } => FacetOp::Terms,
            FacetKind::DateRange { .. } => FacetOp::DateRange,
            FacetKind::Filters { .. } => FacetOp::Filters,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut command = Map::new();
        match &self.kind {
            FacetKind::Terms { field, size, order } => {
                command.insert(token::FACET_FIELD.to_string(), Value::String(field.clone()));
                command.insert(token::FACET_SIZE.to_string(), Value::from(*size));
                command.insert(token::FACET_ORDER.to_string(), Value::String(order.as_str().to_string()));
            }
            FacetKind::DateRange { field, format, ranges } => {
                command.insert(token::FACET_FIELD.to_string(), Value::String(field.clone()));
                command.insert(token::FACET_FORMAT.to_string(), Value::String(format.clone()));
                let buckets = ranges
                    .iter()
                    .map(|bucket| {
                        let mut range = Map::new();
                        if let Some(from) = &bucket.from {
                            range.insert(token::FACET_FROM.to_string(), Value::String(from.clone()));
                        }
                        if let Some(to) = &bucket.to {
                            range.insert(token::FACET_TO.to_string(), Value::String(to.clone()));
                        }
                        Value::Object(range)
                    })
                    .collect();
                command.insert(token::FACET_RANGES.to_string(), Value::Array(buckets));
            }
            FacetKind::Filters { filters } => {
                let named = filters
                    .iter()
                    .map(|(name, predicate)| {
                        let mut filter = Map::new();
                        filter.insert(token::FACET_NAME.to_string(), Value::String(name.clone()));
                        filter.insert(token::FACET_QUERY.to_string(), predicate.to_json());
                        Value::Object(filter)
                    })
                    .collect();
                command.insert(token::FACET_QUERY_FILTERS.to_string(), Value::Array(named));
            }
        }
        let mut node = Map::new();
        node.insert(token::FACET_NAME.to_string(), Value::String(self.name.clone()));
        node.insert(self.op().token().to_string(), Value::Object(command));
        Value::Object(node)
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
