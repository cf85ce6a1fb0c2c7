//! Immutable request model produced by the parser and the builders.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::{Map, Value};

use crate::action::Action;
use crate::facet::Facet;
use crate::query::{Predicate, Query};
use crate::token::{self, FilterHint};

// ------------- Filter -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_i64(&self) -> i64 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(SortOrder::Asc),
            -1 => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub(crate) offset: Option<u64>,
    pub(crate) limit: Option<u64>,
    pub(crate) hints: Option<Vec<FilterHint>>,
    pub(crate) order_by: Option<Vec<(String, SortOrder)>>,
    pub(crate) mult: Option<bool>,
}

impl Filter {
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }
    pub fn hints(&self) -> Option<&[FilterHint]> {
        self.hints.as_deref()
    }
    pub fn order_by(&self) -> Option<&[(String, SortOrder)]> {
        self.order_by.as_deref()
    }
    pub fn mult(&self) -> Option<bool> {
        self.mult
    }
    pub fn is_empty(&self) -> bool {
        *self == Filter::default()
    }

    pub(crate) fn push_hint(&mut self, hint: FilterHint) {
        let hints = self.hints.get_or_insert_with(Vec::new);
        if !hints.contains(&hint) {
            hints.push(hint);
        }
    }
    pub(crate) fn push_order(&mut self, field: &str, order: SortOrder) {
        let orders = self.order_by.get_or_insert_with(Vec::new);
        match orders.iter_mut().find(|(f, _)| f == field) {
            Some(existing) => existing.1 = order,
            None => orders.push((field.to_string(), order)),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut node = Map::new();
        if let Some(offset) = self.offset {
            node.insert(token::OFFSET.to_string(), Value::from(offset));
        }
        if let Some(limit) = self.limit {
            node.insert(token::LIMIT.to_string(), Value::from(limit));
        }
        if let Some(hints) = &self.hints {
            let hints = hints.iter().map(|h| Value::String(h.token().to_string())).collect();
            node.insert(token::HINT.to_string(), Value::Array(hints));
        }
        if let Some(order_by) = &self.order_by {
            let orders = order_by.iter().map(|(f, o)| (f.clone(), Value::from(o.as_i64()))).collect();
            node.insert(token::ORDER_BY.to_string(), Value::Object(orders));
        }
        if let Some(mult) = self.mult {
            node.insert(token::MULT.to_string(), Value::Bool(mult));
        }
        Value::Object(node)
    }
}

// ------------- Projection -------------
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub(crate) fields: Vec<(String, bool)>,
    pub(crate) usage: Option<String>,
}

impl Projection {
    /// Fields and whether each one is returned.
    pub fn fields(&self) -> &[(String, bool)] {
        &self.fields
    }
    pub fn usage(&self) -> Option<&str> {
        self.usage.as_deref()
    }
    /// Number of projection parts present (`$fields`, `$usage`).
    pub fn len(&self) -> usize {
        usize::from(!self.fields.is_empty()) + usize::from(self.usage.is_some())
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn push_field(&mut self, field: &str, used: bool) {
        match self.fields.iter_mut().find(|(f, _)| f == field) {
            Some(existing) => existing.1 = used,
            None => self.fields.push((field.to_string(), used)),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut node = Map::new();
        if !self.fields.is_empty() {
            let fields = self.fields.iter().map(|(f, used)| (f.clone(), Value::from(i64::from(*used)))).collect();
            node.insert(token::FIELDS.to_string(), Value::Object(fields));
        }
        if let Some(usage) = &self.usage {
            node.insert(token::USAGE.to_string(), Value::String(usage.clone()));
        }
        Value::Object(node)
    }
}

// ------------- Request -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl RequestKind {
    /// Classifies a JSON request by the envelope keys it carries.
    pub fn detect(request: &Value) -> RequestKind {
        let has = |key: &str| request.get(key).is_some();
        if has(token::DATA) {
            RequestKind::Insert
        } else if has(token::ACTION) {
            RequestKind::Update
        } else if has(token::PROJECTION) || has(token::FACETS) {
            RequestKind::Select
        } else {
            RequestKind::Delete
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestKind::Select => "select",
            RequestKind::Insert => "insert",
            RequestKind::Update => "update",
            RequestKind::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Kind specific part of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Select { projection: Projection, facets: Vec<Facet> },
    Insert { data: Map<String, Value> },
    Update { actions: Vec<Action> },
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    roots: BTreeSet<String>,
    queries: Vec<Query>,
    filter: Filter,
    body: Body,
    last_depth: i64,
    full_text: bool,
}

impl Request {
    pub(crate) fn new(roots: BTreeSet<String>, queries: Vec<Query>, filter: Filter, body: Body, last_depth: i64) -> Self {
        let full_text = queries.iter().any(|q| q.predicate().has_full_text());
        Self { roots, queries, filter, body, last_depth, full_text }
    }

    pub fn kind(&self) -> RequestKind {
        match self.body {
            Body::Select { .. } => RequestKind::Select,
            Body::Insert { .. } => RequestKind::Insert,
            Body::Update { .. } => RequestKind::Update,
            Body::Delete => RequestKind::Delete,
        }
    }
    pub fn roots(&self) -> &BTreeSet<String> {
        &self.roots
    }
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }
    pub fn filter(&self) -> &Filter {
        &self.filter
    }
    pub fn body(&self) -> &Body {
        &self.body
    }
    pub fn projection(&self) -> Option<&Projection> {
        match &self.body {
            Body::Select { projection, .. } => Some(projection),
            _ => None,
        }
    }
    pub fn facets(&self) -> &[Facet] {
        match &self.body {
            Body::Select { facets, .. } => facets,
            _ => &[],
        }
    }
    pub fn actions(&self) -> &[Action] {
        match &self.body {
            Body::Update { actions } => actions,
            _ => &[],
        }
    }
    pub fn data(&self) -> Option<&Map<String, Value>> {
        match &self.body {
            Body::Insert { data } => Some(data),
            _ => None,
        }
    }
    /// Depth reached by the last query of the chain.
    pub fn last_depth(&self) -> i64 {
        self.last_depth
    }
    /// True when any query needs a text-search backend.
    pub fn has_full_text_query(&self) -> bool {
        self.full_text
    }
    pub fn first_predicate(&self) -> Option<&Predicate> {
        self.queries.first().map(Query::predicate)
    }

    // ------------- Hint helpers -------------
    fn has_hint(&self, hint: FilterHint) -> bool {
        self.filter.hints().is_some_and(|hints| hints.contains(&hint))
    }
    /// True when `cache` was requested and not cancelled by `nocache`.
    pub fn hint_cache(&self) -> bool {
        self.has_hint(FilterHint::Cache) && !self.has_hint(FilterHint::NoCache)
    }
    pub fn hint_no_timeout(&self) -> bool {
        self.has_hint(FilterHint::NoTimeout)
    }
    /// Collection targeted by the request, units unless hinted otherwise.
    pub fn model(&self) -> FilterHint {
        self.filter
            .hints()
            .and_then(|hints| hints.iter().copied().find(FilterHint::is_model))
            .unwrap_or(FilterHint::Units)
    }

    pub fn to_json(&self) -> Value {
        let mut node = Map::new();
        let roots = self.roots.iter().cloned().map(Value::String).collect();
        node.insert(token::ROOTS.to_string(), Value::Array(roots));
        let queries = self.queries.iter().map(Query::to_json).collect();
        node.insert(token::QUERY.to_string(), Value::Array(queries));
        node.insert(token::FILTER.to_string(), self.filter.to_json());
        match &self.body {
            Body::Select { projection, facets } => {
                node.insert(token::PROJECTION.to_string(), projection.to_json());
                if !facets.is_empty() {
                    node.insert(token::FACETS.to_string(), Value::Array(facets.iter().map(Facet::to_json).collect()));
                }
            }
            Body::Insert { data } => {
                node.insert(token::DATA.to_string(), Value::Object(data.clone()));
            }
            Body::Update { actions } => {
                node.insert(token::ACTION.to_string(), Value::Array(actions.iter().map(Action::to_json).collect()));
            }
            Body::Delete => {}
        }
        Value::Object(node)
    }

    /// Canonical text; equal for requests describing the same thing.
    pub fn canonical(&self) -> String {
        self.to_json().to_string()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}
