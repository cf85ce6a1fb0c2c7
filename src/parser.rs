//! JSON to [`Request`].
//!
//! A [`RequestParser`] keeps the running depth and the full-text flag of
//! the last request it parsed; both are reset at the start of every parse.
//! Any failure aborts the whole request, nothing partial is returned.
//!
//! Besides the object envelope
//! `{"$roots": [..], "$query": [..], "$filter": {..}, "$projection": {..}}`
//! the legacy array form `[roots, query, filter, projection|data|action]`
//! is accepted when the kind is known.

use std::collections::{BTreeSet, HashSet};

use ::regex::Regex;
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::action::{self, Action, PopEnd};
use crate::builder::{self, check_bounds, check_field};
use crate::config::Limits;
use crate::depth::DepthCursor;
use crate::error::{CairnError, Result};
use crate::facet::{DateBucket, Facet, FacetKind, FacetOrder};
use crate::query::{Depth, FieldText, FieldValue, FieldValues, Predicate, Query, RangeBounds};
use crate::request::{Body, Filter, Projection, Request, RequestKind, SortOrder};
use crate::token::{self, ActionOp, FacetOp, FilterHint, QueryOp, RangeBound};
use crate::value::Scalar;

// construction errors raised by shared checks are parse errors here
fn reject(e: CairnError) -> CairnError {
    match e {
        CairnError::Construction(message) => CairnError::Parse { message },
        other => other,
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn expect_object<'a>(what: &str, value: &'a Value) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| CairnError::parse(format!("{what} expects an object, found {}", kind_name(value))))
}

fn expect_str<'a>(what: &str, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| CairnError::parse(format!("{what} expects a string, found {}", kind_name(value))))
}

fn expect_u64(what: &str, value: &Value) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| CairnError::parse(format!("{what} expects a non-negative integer, found {value}")))
}

/// Objects or arrays of objects; a lone object counts as a list of one.
fn as_list<'a>(what: &str, value: &'a Value) -> Result<Vec<&'a Value>> {
    match value {
        Value::Array(items) => Ok(items.iter().collect()),
        Value::Object(_) => Ok(vec![value]),
        other => Err(CairnError::parse(format!("{what} expects an array, found {}", kind_name(other)))),
    }
}

/// The only entry of a single-key object.
fn single_entry<'a>(what: &str, value: &'a Value) -> Result<(&'a String, &'a Value)> {
    let map = expect_object(what, value)?;
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Ok(entry),
        _ => Err(CairnError::parse(format!("{what} expects exactly one field, found {}", map.len()))),
    }
}

#[derive(Debug)]
pub struct RequestParser {
    limits: Limits,
    last_depth: i64,
    full_text: bool,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

impl RequestParser {
    pub fn new(limits: Limits) -> Self {
        Self { limits, last_depth: 0, full_text: false }
    }
    pub fn limits(&self) -> &Limits {
        &self.limits
    }
    /// Depth reached by the last parsed request.
    pub fn last_depth(&self) -> i64 {
        self.last_depth
    }
    /// Whether the last parsed request holds a full-text operator.
    pub fn has_full_text_query(&self) -> bool {
        self.full_text
    }

    fn reset(&mut self) {
        self.last_depth = 0;
        self.full_text = false;
    }

    /// Rejects a request text longer than `limit_request`.
    pub fn sanity_check_request(&self, length: usize) -> Result<()> {
        if length > self.limits.limit_request {
            return Err(CairnError::parse(format!(
                "request is too long: {length} characters for a limit of {}",
                self.limits.limit_request
            )));
        }
        Ok(())
    }

    fn sanity_check_parameter(&self, what: &str, parameter: &str) -> Result<()> {
        if parameter.len() > self.limits.limit_parameter {
            return Err(CairnError::parse(format!(
                "{what} is too long: {} characters for a limit of {}",
                parameter.len(),
                self.limits.limit_parameter
            )));
        }
        Ok(())
    }

    fn sanity_check_value(&self, field: &str, scalar: &Scalar) -> Result<()> {
        if scalar.text_len() > self.limits.limit_value {
            return Err(CairnError::parse(format!(
                "value of {field} is too long: {} characters for a limit of {}",
                scalar.text_len(),
                self.limits.limit_value
            )));
        }
        Ok(())
    }

    fn field(&self, name: &str) -> Result<String> {
        check_field(name).map_err(reject)?;
        self.sanity_check_parameter("field name", name)?;
        Ok(name.to_string())
    }

    fn scalar(&self, field: &str, value: &Value) -> Result<Scalar> {
        let scalar = Scalar::from_json(value)?;
        self.sanity_check_value(field, &scalar)?;
        Ok(scalar)
    }

    // ------------- Entry points -------------
    /// Parses a request, its kind detected from the envelope.
    pub fn parse(&mut self, text: &str) -> Result<Request> {
        self.reset();
        self.sanity_check_request(text.len())?;
        let value: Value = serde_json::from_str(text)?;
        if value.is_array() {
            return Err(CairnError::parse("the array form needs an explicit request kind"));
        }
        let kind = RequestKind::detect(&value);
        self.parse_checked(kind, &value)
    }

    /// Parses a request of a known kind.
    pub fn parse_as(&mut self, kind: RequestKind, text: &str) -> Result<Request> {
        self.reset();
        self.sanity_check_request(text.len())?;
        let value: Value = serde_json::from_str(text)?;
        self.parse_checked(kind, &value)
    }

    /// Parses an already decoded request.
    pub fn parse_value(&mut self, kind: RequestKind, value: &Value) -> Result<Request> {
        self.reset();
        self.sanity_check_request(value.to_string().len())?;
        self.parse_checked(kind, value)
    }

    pub fn parse_select(&mut self, text: &str) -> Result<Request> {
        self.parse_as(RequestKind::Select, text)
    }
    pub fn parse_update(&mut self, text: &str) -> Result<Request> {
        self.parse_as(RequestKind::Update, text)
    }
    pub fn parse_insert(&mut self, text: &str) -> Result<Request> {
        self.parse_as(RequestKind::Insert, text)
    }
    pub fn parse_delete(&mut self, text: &str) -> Result<Request> {
        self.parse_as(RequestKind::Delete, text)
    }

    /// Parses a single root query without envelope; `{}` gives `None`.
    pub fn parse_query_only(&mut self, text: &str) -> Result<Option<Query>> {
        self.reset();
        self.sanity_check_request(text.len())?;
        let value: Value = serde_json::from_str(text)?;
        let query = self.parse_root_query(&value)?;
        if let Some(query) = &query {
            let (cursor, _) = DepthCursor::new().step(query)?;
            self.last_depth = cursor.last_depth();
            self.full_text = query.predicate().has_full_text();
        }
        Ok(query)
    }

    fn parse_checked(&mut self, kind: RequestKind, value: &Value) -> Result<Request> {
        debug!(%kind, "parsing request");
        let envelope = match value {
            Value::Array(parts) => Self::from_array_form(kind, parts)?,
            Value::Object(map) => map.clone(),
            other => return Err(CairnError::parse(format!("a request is an object, found {}", kind_name(other)))),
        };
        let request = self.parse_envelope(kind, &envelope)?;
        self.last_depth = request.last_depth();
        self.full_text = request.has_full_text_query();
        debug!(
            %kind,
            queries = request.queries().len(),
            last_depth = self.last_depth,
            full_text = self.full_text,
            "request parsed"
        );
        Ok(request)
    }

    /// Maps the positional array form `[roots, query, filter, body]` to an envelope.
    pub fn from_array_form(kind: RequestKind, parts: &[Value]) -> Result<Map<String, Value>> {
        let body_key = match kind {
            RequestKind::Select => Some(token::PROJECTION),
            RequestKind::Insert => Some(token::DATA),
            RequestKind::Update => Some(token::ACTION),
            RequestKind::Delete => None,
        };
        let max_parts = if body_key.is_some() { 4 } else { 3 };
        if parts.len() > max_parts {
            return Err(CairnError::parse(format!("a {kind} request has at most {max_parts} parts, found {}", parts.len())));
        }
        let keys = [Some(token::ROOTS), Some(token::QUERY), Some(token::FILTER), body_key];
        let mut envelope = Map::new();
        for (key, part) in keys.iter().zip(parts) {
            if let Some(key) = key {
                envelope.insert(key.to_string(), part.clone());
            }
        }
        Ok(envelope)
    }

    fn parse_envelope(&self, kind: RequestKind, envelope: &Map<String, Value>) -> Result<Request> {
        let allowed: &[&str] = match kind {
            RequestKind::Select => &[token::ROOTS, token::QUERY, token::FILTER, token::PROJECTION, token::FACETS],
            RequestKind::Insert => &[token::ROOTS, token::QUERY, token::FILTER, token::DATA],
            RequestKind::Update => &[token::ROOTS, token::QUERY, token::FILTER, token::ACTION],
            RequestKind::Delete => &[token::ROOTS, token::QUERY, token::FILTER],
        };
        if let Some(unknown) = envelope.keys().find(|key| !allowed.contains(&key.as_str())) {
            return Err(CairnError::parse(format!("unexpected {unknown} in a {kind} request")));
        }
        let null = Value::Null;
        let part = |key: &str| envelope.get(key).unwrap_or(&null);

        let roots = self.parse_roots(part(token::ROOTS))?;
        let (queries, last_depth) = self.parse_queries(part(token::QUERY))?;
        let filter = self.parse_filter(kind, part(token::FILTER))?;
        let body = match kind {
            RequestKind::Select => Body::Select {
                projection: self.parse_projection(part(token::PROJECTION))?,
                facets: self.parse_facets(part(token::FACETS))?,
            },
            RequestKind::Insert => Body::Insert { data: self.parse_data(part(token::DATA))? },
            RequestKind::Update => Body::Update { actions: self.parse_actions(part(token::ACTION))? },
            RequestKind::Delete => Body::Delete,
        };
        Ok(Request::new(roots, queries, filter, body, last_depth))
    }

    // ------------- Roots -------------
    pub fn parse_roots(&self, value: &Value) -> Result<BTreeSet<String>> {
        let ids: Vec<&Value> = match value {
            Value::Null => Vec::new(),
            Value::String(_) => vec![value],
            Value::Array(items) => items.iter().collect(),
            other => return Err(CairnError::parse(format!("{} expects an array of ids, found {}", token::ROOTS, kind_name(other)))),
        };
        if ids.len() > self.limits.max_roots {
            return Err(CairnError::parse(format!("too many roots: {} for a limit of {}", ids.len(), self.limits.max_roots)));
        }
        let mut roots = BTreeSet::new();
        for id in ids {
            let id = expect_str(token::ROOTS, id)?;
            if id.is_empty() {
                return Err(CairnError::parse("root id cannot be empty"));
            }
            self.sanity_check_parameter("root id", id)?;
            roots.insert(id.to_string());
        }
        Ok(roots)
    }

    // ------------- Queries -------------
    /// Root queries with the depth reached by the last one.
    fn parse_queries(&self, value: &Value) -> Result<(Vec<Query>, i64)> {
        let items = match value {
            Value::Null => Vec::new(),
            other => as_list(token::QUERY, other)?,
        };
        if items.len() > self.limits.max_queries {
            return Err(CairnError::parse(format!("too many queries: {} for a limit of {}", items.len(), self.limits.max_queries)));
        }
        let mut cursor = DepthCursor::new();
        let mut queries = Vec::with_capacity(items.len());
        for item in items {
            if let Some(query) = self.parse_root_query(item)? {
                let (next, _) = cursor.step(&query)?;
                cursor = next;
                queries.push(query);
            }
        }
        Ok((queries, cursor.last_depth()))
    }

    /// One root query and its depth qualifier; `{}` is skipped.
    pub fn parse_root_query(&self, value: &Value) -> Result<Option<Query>> {
        let node = expect_object(token::QUERY, value)?;
        if node.is_empty() {
            return Ok(None);
        }
        let mut depth = Depth::Implicit;
        let mut operator = None;
        for (key, operand) in node {
            match key.as_str() {
                token::DEPTH => {
                    if depth != Depth::Implicit {
                        return Err(CairnError::parse("a query cannot carry both $depth and $exactdepth"));
                    }
                    let relative = operand
                        .as_i64()
                        .ok_or_else(|| CairnError::parse(format!("{} expects an integer, found {operand}", token::DEPTH)))?;
                    depth = Depth::Relative(relative);
                }
                token::EXACT_DEPTH => {
                    if depth != Depth::Implicit {
                        return Err(CairnError::parse("a query cannot carry both $depth and $exactdepth"));
                    }
                    depth = Depth::Exact(expect_u64(token::EXACT_DEPTH, operand)?);
                }
                _ => {
                    if operator.is_some() {
                        return Err(CairnError::parse(format!("a query holds a single operator, found another one: {key}")));
                    }
                    operator = Some((key, operand));
                }
            }
        }
        let (key, operand) = operator.ok_or_else(|| CairnError::parse("a query needs an operator besides its depth"))?;
        let predicate = self.parse_operator(key, operand)?;
        if matches!(predicate, Predicate::Path(_)) && depth != Depth::Implicit {
            return Err(CairnError::parse("$path cannot carry a depth qualifier"));
        }
        Ok(Some(Query::new(predicate, depth)))
    }

    /// A nested query: one operator, no depth qualifier.
    fn parse_child(&self, value: &Value) -> Result<Predicate> {
        let (key, operand) = single_entry("a nested query", value)?;
        if key == token::DEPTH || key == token::EXACT_DEPTH {
            return Err(CairnError::parse(format!("{key} is only allowed on root queries")));
        }
        let predicate = self.parse_operator(key, operand)?;
        if matches!(predicate, Predicate::Path(_)) {
            return Err(CairnError::parse("$path cannot be nested"));
        }
        Ok(predicate)
    }

    fn parse_operator(&self, key: &str, operand: &Value) -> Result<Predicate> {
        let op = QueryOp::from_token(key).ok_or_else(|| CairnError::parse(format!("unknown operator {key}")))?;
        let predicate = match op {
            QueryOp::And | QueryOp::Or | QueryOp::Not => {
                let children = as_list(key, operand)?
                    .into_iter()
                    .map(|child| self.parse_child(child))
                    .collect::<Result<Vec<_>>>()?;
                if children.is_empty() {
                    return Err(CairnError::parse(format!("{op} needs at least one child query")));
                }
                match op {
                    QueryOp::And => Predicate::And(children),
                    QueryOp::Or => Predicate::Or(children),
                    _ => Predicate::Not(children),
                }
            }
            QueryOp::Exists | QueryOp::Missing | QueryOp::IsNull => {
                let field = self.field(expect_str(key, operand)?)?;
                match op {
                    QueryOp::Exists => Predicate::Exists(field),
                    QueryOp::Missing => Predicate::Missing(field),
                    _ => Predicate::IsNull(field),
                }
            }
            QueryOp::Eq | QueryOp::Ne | QueryOp::Gt | QueryOp::Gte | QueryOp::Lt | QueryOp::Lte => {
                let (field, value) = single_entry(key, operand)?;
                let fv = FieldValue { field: self.field(field)?, value: self.scalar(field, value)? };
                match op {
                    QueryOp::Eq => Predicate::Eq(fv),
                    QueryOp::Ne => Predicate::Ne(fv),
                    QueryOp::Gt => Predicate::Gt(fv),
                    QueryOp::Gte => Predicate::Gte(fv),
                    QueryOp::Lt => Predicate::Lt(fv),
                    _ => Predicate::Lte(fv),
                }
            }
            QueryOp::Range => {
                let (field, bounds) = single_entry(key, operand)?;
                let mut parsed = Vec::new();
                for (bound, value) in expect_object(key, bounds)? {
                    let bound = RangeBound::from_token(bound)
                        .ok_or_else(|| CairnError::parse(format!("unknown {key} bound {bound}")))?;
                    parsed.push((bound, self.scalar(field, value)?));
                }
                check_bounds(field, &parsed).map_err(reject)?;
                Predicate::Range(RangeBounds { field: self.field(field)?, bounds: parsed })
            }
            QueryOp::In | QueryOp::Nin => {
                let (field, values) = single_entry(key, operand)?;
                let values = values
                    .as_array()
                    .ok_or_else(|| CairnError::parse(format!("{key} expects an array of values")))?;
                if values.is_empty() {
                    return Err(CairnError::parse(format!("{key} on {field} needs at least one value")));
                }
                let values = values.iter().map(|v| self.scalar(field, v)).collect::<Result<Vec<_>>>()?;
                let fv = FieldValues { field: self.field(field)?, values };
                if op == QueryOp::In { Predicate::In(fv) } else { Predicate::Nin(fv) }
            }
            QueryOp::Size => {
                let (field, size) = single_entry(key, operand)?;
                Predicate::Size { field: self.field(field)?, size: expect_u64(key, size)? }
            }
            QueryOp::Regex => {
                let (field, pattern) = single_entry(key, operand)?;
                let pattern = expect_str(key, pattern)?;
                self.sanity_check_value(field, &Scalar::Str(pattern.to_string()))?;
                Regex::new(pattern).map_err(|e| CairnError::parse(format!("invalid {key} on {field}: {e}")))?;
                Predicate::Regex { field: self.field(field)?, pattern: pattern.to_string() }
            }
            QueryOp::Path => {
                let ids: Vec<&Value> = match operand {
                    Value::String(_) => vec![operand],
                    Value::Array(items) => items.iter().collect(),
                    other => return Err(CairnError::parse(format!("{key} expects an array of ids, found {}", kind_name(other)))),
                };
                let ids = ids
                    .into_iter()
                    .map(|id| expect_str(key, id).map(str::to_string))
                    .collect::<Result<Vec<_>>>()?;
                if ids.is_empty() || ids.iter().any(String::is_empty) {
                    return Err(CairnError::parse(format!("{key} needs at least one non-empty id")));
                }
                Predicate::Path(ids)
            }
            QueryOp::Match | QueryOp::MatchPhrase | QueryOp::Search => {
                let (field, text) = single_entry(key, operand)?;
                let text = expect_str(key, text)?;
                self.sanity_check_value(field, &Scalar::Str(text.to_string()))?;
                let ft = FieldText { field: self.field(field)?, text: text.to_string() };
                match op {
                    QueryOp::Match => Predicate::Match(ft),
                    QueryOp::MatchPhrase => Predicate::MatchPhrase(ft),
                    _ => Predicate::Search(ft),
                }
            }
            QueryOp::MatchPhrasePrefix => {
                let mut max_expansions = None;
                let mut phrase = None;
                for (field, value) in expect_object(key, operand)? {
                    if field == token::MAX_EXPANSIONS {
                        max_expansions = Some(expect_u64(token::MAX_EXPANSIONS, value)?);
                    } else if phrase.is_some() {
                        return Err(CairnError::parse(format!("{key} expects exactly one field")));
                    } else {
                        phrase = Some((field, expect_str(key, value)?));
                    }
                }
                let (field, text) = phrase.ok_or_else(|| CairnError::parse(format!("{key} needs a field")))?;
                self.sanity_check_value(field, &Scalar::Str(text.to_string()))?;
                Predicate::MatchPhrasePrefix { field: self.field(field)?, text: text.to_string(), max_expansions }
            }
            QueryOp::Flt => {
                let args = expect_object(key, operand)?;
                if let Some(unknown) = args.keys().find(|k| *k != token::FLT_FIELDS && *k != token::FLT_LIKE) {
                    return Err(CairnError::parse(format!("unexpected {unknown} in {key}")));
                }
                let like = args
                    .get(token::FLT_LIKE)
                    .ok_or_else(|| CairnError::parse(format!("{key} needs {}", token::FLT_LIKE)))?;
                let like = expect_str(token::FLT_LIKE, like)?;
                let fields = match args.get(token::FLT_FIELDS) {
                    Some(Value::Array(fields)) => fields
                        .iter()
                        .map(|f| expect_str(token::FLT_FIELDS, f).and_then(|f| self.field(f)))
                        .collect::<Result<Vec<_>>>()?,
                    Some(Value::String(field)) => vec![self.field(field)?],
                    _ => Vec::new(),
                };
                if fields.is_empty() {
                    return Err(CairnError::parse(format!("{key} needs at least one field")));
                }
                Predicate::Flt { fields, like: like.to_string() }
            }
            QueryOp::Term => {
                let terms = expect_object(key, operand)?;
                if terms.is_empty() {
                    return Err(CairnError::parse(format!("{key} needs at least one field")));
                }
                let terms = terms
                    .iter()
                    .map(|(field, value)| Ok((self.field(field)?, self.scalar(field, value)?)))
                    .collect::<Result<Vec<_>>>()?;
                Predicate::Term(terms)
            }
        };
        Ok(predicate)
    }

    // ------------- Filter -------------
    /// Filter of a request of the given kind; `null` is an empty filter.
    ///
    /// Selects get `limit_load` as limit when none (or 0) is given and only
    /// keep a positive offset. Other kinds accept `$hint` and `$mult` only.
    pub fn parse_filter(&self, kind: RequestKind, value: &Value) -> Result<Filter> {
        let mut filter = Filter::default();
        let empty = Map::new();
        let entries = match value {
            Value::Null => &empty,
            other => expect_object(token::FILTER, other)?,
        };
        let select = kind == RequestKind::Select;
        for (key, arg) in entries {
            match key.as_str() {
                token::OFFSET if select => {
                    let offset = expect_u64(token::OFFSET, arg)?;
                    filter.offset = (offset > 0).then_some(offset);
                }
                token::LIMIT if select => {
                    let limit = expect_u64(token::LIMIT, arg)?;
                    filter.limit = (limit > 0).then_some(limit);
                }
                token::ORDER_BY if select => {
                    for (field, order) in expect_object(token::ORDER_BY, arg)? {
                        let order = order
                            .as_i64()
                            .and_then(SortOrder::from_i64)
                            .ok_or_else(|| CairnError::parse(format!("{} of {field} expects 1 or -1, found {order}", token::ORDER_BY)))?;
                        filter.push_order(&self.field(field)?, order);
                    }
                }
                token::MULT if !select => {
                    let mult = arg
                        .as_bool()
                        .ok_or_else(|| CairnError::parse(format!("{} expects a boolean, found {arg}", token::MULT)))?;
                    filter.mult = Some(mult);
                }
                token::HINT => {
                    let hints: Vec<&Value> = match arg {
                        Value::String(_) => vec![arg],
                        Value::Array(items) => items.iter().collect(),
                        other => return Err(CairnError::parse(format!("{} expects a string or an array, found {}", token::HINT, kind_name(other)))),
                    };
                    for hint in hints {
                        let hint = expect_str(token::HINT, hint)?;
                        self.sanity_check_parameter("hint", hint)?;
                        let hint = FilterHint::from_token(hint)
                            .ok_or_else(|| CairnError::parse(format!("unknown hint {hint}")))?;
                        filter.push_hint(hint);
                    }
                }
                other => return Err(CairnError::parse(format!("unexpected {other} in the filter of a {kind} request"))),
            }
        }
        if select && filter.limit.is_none() {
            filter.limit = Some(self.limits.limit_load);
        }
        Ok(filter)
    }

    // ------------- Projection -------------
    pub fn parse_projection(&self, value: &Value) -> Result<Projection> {
        let mut projection = Projection::default();
        if value.is_null() {
            return Ok(projection);
        }
        for (key, arg) in expect_object(token::PROJECTION, value)? {
            match key.as_str() {
                token::FIELDS => {
                    for (field, used) in expect_object(token::FIELDS, arg)? {
                        let used = match used {
                            Value::Bool(b) => *b,
                            Value::Number(n) if n.as_i64() == Some(1) => true,
                            Value::Number(n) if n.as_i64() == Some(0) => false,
                            other => return Err(CairnError::parse(format!("{} of {field} expects 0 or 1, found {other}", token::FIELDS))),
                        };
                        projection.push_field(&self.field(field)?, used);
                    }
                }
                token::USAGE => {
                    let usage = expect_str(token::USAGE, arg)?;
                    if usage.is_empty() {
                        return Err(CairnError::parse("usage cannot be empty"));
                    }
                    self.sanity_check_parameter("usage", usage)?;
                    projection.usage = Some(usage.to_string());
                }
                other => return Err(CairnError::parse(format!("unexpected {other} in the projection"))),
            }
        }
        Ok(projection)
    }

    // ------------- Actions -------------
    pub fn parse_actions(&self, value: &Value) -> Result<Vec<Action>> {
        let items = as_list(token::ACTION, value)?;
        if items.is_empty() {
            return Err(CairnError::parse("an update needs at least one action"));
        }
        if items.len() > self.limits.max_actions {
            return Err(CairnError::parse(format!("too many actions: {} for a limit of {}", items.len(), self.limits.max_actions)));
        }
        items.into_iter().map(|item| self.parse_action(item)).collect()
    }

    fn target(&self, field: &str) -> Result<String> {
        action::check_target(field).map_err(reject)?;
        self.sanity_check_parameter("field name", field)?;
        Ok(field.to_string())
    }

    fn parse_action(&self, value: &Value) -> Result<Action> {
        let (key, operand) = single_entry("an action", value)?;
        let op = ActionOp::from_token(key).ok_or_else(|| CairnError::parse(format!("unknown action {key}")))?;
        if op == ActionOp::Unset {
            let fields = match operand {
                Value::Array(fields) => fields.iter().map(|f| expect_str(key, f)).collect::<Result<Vec<_>>>()?,
                Value::String(field) => vec![field.as_str()],
                other => return Err(CairnError::parse(format!("{key} expects an array of fields, found {}", kind_name(other)))),
            };
            if fields.is_empty() {
                return Err(CairnError::parse(format!("{key} needs at least one field")));
            }
            return Ok(Action::Unset(fields.into_iter().map(|f| self.target(f)).collect::<Result<Vec<_>>>()?));
        }
        let pairs = expect_object(key, operand)?;
        if pairs.is_empty() {
            return Err(CairnError::parse(format!("{key} needs at least one field")));
        }
        let number = |field: &str, value: &Value| -> Result<Number> {
            match value {
                Value::Number(n) => Ok(n.clone()),
                other => Err(CairnError::parse(format!("{key} of {field} expects a number, found {other}"))),
            }
        };
        let values = |field: &str, value: &Value| -> Result<Vec<Value>> {
            match value {
                Value::Array(values) => Ok(values.clone()),
                Value::Object(each) if each.len() == 1 => match each.get(token::EACH) {
                    Some(Value::Array(values)) => Ok(values.clone()),
                    _ => Err(CairnError::parse(format!("{key} of {field} expects {} with an array", token::EACH))),
                },
                other => Err(CairnError::parse(format!("{key} of {field} expects an array, found {other}"))),
            }
        };
        let action = match op {
            ActionOp::Set => Action::Set(
                pairs
                    .iter()
                    .map(|(f, v)| Ok((self.target(f)?, v.clone())))
                    .collect::<Result<Vec<_>>>()?,
            ),
            ActionOp::Inc | ActionOp::Min | ActionOp::Max => {
                let pairs = pairs
                    .iter()
                    .map(|(f, v)| Ok((self.target(f)?, number(f, v)?)))
                    .collect::<Result<Vec<_>>>()?;
                match op {
                    ActionOp::Inc => Action::Inc(pairs),
                    ActionOp::Min => Action::Min(pairs),
                    _ => Action::Max(pairs),
                }
            }
            ActionOp::Rename => Action::Rename(
                pairs
                    .iter()
                    .map(|(f, v)| Ok((self.target(f)?, self.target(expect_str(key, v)?)?)))
                    .collect::<Result<Vec<_>>>()?,
            ),
            ActionOp::Push | ActionOp::Add | ActionOp::Pull => {
                let pairs = pairs
                    .iter()
                    .map(|(f, v)| Ok((self.target(f)?, values(f, v)?)))
                    .collect::<Result<Vec<_>>>()?;
                match op {
                    ActionOp::Push => Action::Push(pairs),
                    ActionOp::Add => Action::Add(pairs),
                    _ => Action::Pull(pairs),
                }
            }
            ActionOp::Pop => Action::Pop(
                pairs
                    .iter()
                    .map(|(f, v)| {
                        let end = v
                            .as_i64()
                            .and_then(PopEnd::from_i64)
                            .ok_or_else(|| CairnError::parse(format!("{key} of {f} expects 1 or -1, found {v}")))?;
                        Ok((self.target(f)?, end))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            ActionOp::Unset => return Err(CairnError::parse(format!("{key} expects an array of fields"))),
        };
        Ok(action)
    }

    // ------------- Data -------------
    pub fn parse_data(&self, value: &Value) -> Result<Map<String, Value>> {
        let data = expect_object(token::DATA, value)?;
        builder::check_data(data)?;
        Ok(data.clone())
    }

    // ------------- Facets -------------
    pub fn parse_facets(&self, value: &Value) -> Result<Vec<Facet>> {
        let items = match value {
            Value::Null => return Ok(Vec::new()),
            other => as_list(token::FACETS, other)?,
        };
        let mut names = HashSet::new();
        let mut facets = Vec::with_capacity(items.len());
        for item in items {
            let facet = self.parse_facet(item)?;
            if !names.insert(facet.name().to_string()) {
                return Err(CairnError::parse(format!("facet {} is defined twice", facet.name())));
            }
            facets.push(facet);
        }
        Ok(facets)
    }

    fn parse_facet(&self, value: &Value) -> Result<Facet> {
        let node = expect_object(token::FACETS, value)?;
        let name = node
            .get(token::FACET_NAME)
            .ok_or_else(|| CairnError::parse(format!("a facet needs {}", token::FACET_NAME)))?;
        let name = expect_str(token::FACET_NAME, name)?;
        let mut command = None;
        for (key, args) in node.iter().filter(|(k, _)| *k != token::FACET_NAME) {
            let op = FacetOp::from_token(key).ok_or_else(|| CairnError::parse(format!("unknown facet command {key}")))?;
            if command.is_some() {
                return Err(CairnError::parse(format!("facet {name} holds more than one command")));
            }
            command = Some((op, expect_object(key, args)?));
        }
        let (op, args) = command.ok_or_else(|| CairnError::parse(format!("facet {name} needs a command")))?;
        let required = |arg: &str| -> Result<&Value> {
            args.get(arg).ok_or_else(|| CairnError::parse(format!("{op} of facet {name} needs {arg}")))
        };
        let kind = match op {
            FacetOp::Terms => FacetKind::Terms {
                field: self.field(expect_str(token::FACET_FIELD, required(token::FACET_FIELD)?)?)?,
                size: expect_u64(token::FACET_SIZE, required(token::FACET_SIZE)?)?,
                order: FacetOrder::parse(expect_str(token::FACET_ORDER, required(token::FACET_ORDER)?)?)
                    .ok_or_else(|| CairnError::parse(format!("{} expects ASC or DESC", token::FACET_ORDER)))?,
            },
            FacetOp::DateRange => {
                let ranges = required(token::FACET_RANGES)?
                    .as_array()
                    .ok_or_else(|| CairnError::parse(format!("{} expects an array", token::FACET_RANGES)))?;
                let ranges = ranges
                    .iter()
                    .map(|range| {
                        let bound = |side: &str| -> Result<Option<String>> {
                            match expect_object(token::FACET_RANGES, range)?.get(side) {
                                None | Some(Value::Null) => Ok(None),
                                Some(v) => Ok(Some(expect_str(side, v)?.to_string())),
                            }
                        };
                        Ok(DateBucket { from: bound(token::FACET_FROM)?, to: bound(token::FACET_TO)? })
                    })
                    .collect::<Result<Vec<_>>>()?;
                FacetKind::DateRange {
                    field: self.field(expect_str(token::FACET_FIELD, required(token::FACET_FIELD)?)?)?,
                    format: expect_str(token::FACET_FORMAT, required(token::FACET_FORMAT)?)?.to_string(),
                    ranges,
                }
            }
            FacetOp::Filters => {
                let filters = required(token::FACET_QUERY_FILTERS)?
                    .as_array()
                    .ok_or_else(|| CairnError::parse(format!("{} expects an array", token::FACET_QUERY_FILTERS)))?;
                let filters = filters
                    .iter()
                    .map(|filter| {
                        let filter = expect_object(token::FACET_QUERY_FILTERS, filter)?;
                        let filter_name = filter
                            .get(token::FACET_NAME)
                            .ok_or_else(|| CairnError::parse(format!("a query filter needs {}", token::FACET_NAME)))?;
                        let query = filter
                            .get(token::FACET_QUERY)
                            .ok_or_else(|| CairnError::parse(format!("a query filter needs {}", token::FACET_QUERY)))?;
                        Ok((expect_str(token::FACET_NAME, filter_name)?.to_string(), self.parse_child(query)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                FacetKind::Filters { filters }
            }
        };
        Facet::new(name, kind).map_err(reject)
    }
}
