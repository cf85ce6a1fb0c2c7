//! Fluent construction of queries, actions, facets and whole requests.
//!
//! Leaf constructors validate their operands immediately and return an
//! error for anything the parser would refuse. Logical nodes start empty
//! and are filled with [`Query::add`]; an empty one is only rejected when
//! the node reaches a request.
//!
//! ```
//! use cairn::builder::*;
//! let mut select = Select::new();
//! select
//!     .add_roots(["id0"]).unwrap()
//!     .add_queries([and().add([eq("Title", "Annual report").unwrap(), exists("Description").unwrap()]).unwrap()])
//!     .unwrap()
//!     .set_limit_filter(0, 100);
//! let json = select.final_select().unwrap();
//! assert_eq!(json["$filter"]["$limit"], 100);
//! ```

use std::collections::BTreeSet;

use ::regex::Regex;
use serde_json::{Map, Number, Value};

use crate::action::{self, Action, PopEnd};
use crate::depth;
use crate::error::{CairnError, Result};
use crate::facet::{DateBucket, Facet, FacetKind, FacetOrder};
use crate::query::{Depth, FieldText, FieldValue, FieldValues, Predicate, Query, RangeBounds};
use crate::request::{Body, Filter, Projection, Request, SortOrder};
use crate::token::{self, FilterHint, RangeBound};
use crate::value::Scalar;

/// Field names used by predicates, projections and sort keys.
pub(crate) fn check_field(field: &str) -> Result<()> {
    if field.is_empty() {
        return Err(CairnError::construction("field name cannot be empty"));
    }
    if field.starts_with('_') {
        return Err(CairnError::construction(format!("field {field} is internal and cannot be queried")));
    }
    if field.starts_with(token::TOKEN_PREFIX) {
        return Err(CairnError::construction(format!("field {field} cannot start with {}", token::TOKEN_PREFIX)));
    }
    Ok(())
}

fn fields_of<'a>(fields: impl IntoIterator<Item = &'a str>) -> Result<Vec<String>> {
    fields
        .into_iter()
        .map(|field| check_field(field).map(|_| field.to_string()))
        .collect()
}

// ------------- Logical -------------
pub fn and() -> Query {
    Predicate::And(Vec::new()).into()
}
pub fn or() -> Query {
    Predicate::Or(Vec::new()).into()
}
pub fn not() -> Query {
    Predicate::Not(Vec::new()).into()
}

// ------------- Unary field -------------
pub fn exists(field: &str) -> Result<Query> {
    check_field(field)?;
    Ok(Predicate::Exists(field.to_string()).into())
}
pub fn missing(field: &str) -> Result<Query> {
    check_field(field)?;
    Ok(Predicate::Missing(field.to_string()).into())
}
pub fn is_null(field: &str) -> Result<Query> {
    check_field(field)?;
    Ok(Predicate::IsNull(field.to_string()).into())
}

// ------------- Comparison -------------
fn field_value(field: &str, value: impl Into<Scalar>) -> Result<FieldValue> {
    check_field(field)?;
    Ok(FieldValue { field: field.to_string(), value: value.into() })
}
pub fn eq(field: &str, value: impl Into<Scalar>) -> Result<Query> {
    Ok(Predicate::Eq(field_value(field, value)?).into())
}
pub fn ne(field: &str, value: impl Into<Scalar>) -> Result<Query> {
    Ok(Predicate::Ne(field_value(field, value)?).into())
}
pub fn gt(field: &str, value: impl Into<Scalar>) -> Result<Query> {
    Ok(Predicate::Gt(field_value(field, value)?).into())
}
pub fn gte(field: &str, value: impl Into<Scalar>) -> Result<Query> {
    Ok(Predicate::Gte(field_value(field, value)?).into())
}
pub fn lt(field: &str, value: impl Into<Scalar>) -> Result<Query> {
    Ok(Predicate::Lt(field_value(field, value)?).into())
}
pub fn lte(field: &str, value: impl Into<Scalar>) -> Result<Query> {
    Ok(Predicate::Lte(field_value(field, value)?).into())
}

// ------------- Range -------------
/// `$range` between two bounds, each one inclusive or not.
pub fn range(
    field: &str,
    from: impl Into<Scalar>,
    include_from: bool,
    to: impl Into<Scalar>,
    include_to: bool,
) -> Result<Query> {
    let lower = if include_from { RangeBound::Gte } else { RangeBound::Gt };
    let upper = if include_to { RangeBound::Lte } else { RangeBound::Lt };
    range_bounds(field, vec![(lower, from.into()), (upper, to.into())])
}

/// `$range` from explicit bounds, at most one lower and one upper.
pub fn range_bounds(field: &str, bounds: Vec<(RangeBound, Scalar)>) -> Result<Query> {
    check_field(field)?;
    check_bounds(field, &bounds)?;
    Ok(Predicate::Range(RangeBounds { field: field.to_string(), bounds }).into())
}

pub(crate) fn check_bounds(field: &str, bounds: &[(RangeBound, Scalar)]) -> Result<()> {
    if bounds.is_empty() {
        return Err(CairnError::construction(format!("$range on {field} needs at least one bound")));
    }
    let lowers = bounds.iter().filter(|(b, _)| b.is_lower()).count();
    if lowers > 1 || bounds.len() - lowers > 1 {
        return Err(CairnError::construction(format!("$range on {field} has conflicting bounds")));
    }
    Ok(())
}

// ------------- Set membership -------------
fn field_values<S: Into<Scalar>>(field: &str, values: impl IntoIterator<Item = S>) -> Result<FieldValues> {
    check_field(field)?;
    let values: Vec<Scalar> = values.into_iter().map(Into::into).collect();
    if values.is_empty() {
        return Err(CairnError::construction(format!("membership on {field} needs at least one value")));
    }
    Ok(FieldValues { field: field.to_string(), values })
}
pub fn in_<S: Into<Scalar>>(field: &str, values: impl IntoIterator<Item = S>) -> Result<Query> {
    Ok(Predicate::In(field_values(field, values)?).into())
}
pub fn nin<S: Into<Scalar>>(field: &str, values: impl IntoIterator<Item = S>) -> Result<Query> {
    Ok(Predicate::Nin(field_values(field, values)?).into())
}

// ------------- Structural -------------
pub fn size(field: &str, size: u64) -> Result<Query> {
    check_field(field)?;
    Ok(Predicate::Size { field: field.to_string(), size }.into())
}
pub fn regex(field: &str, pattern: &str) -> Result<Query> {
    check_field(field)?;
    Regex::new(pattern)?;
    Ok(Predicate::Regex { field: field.to_string(), pattern: pattern.to_string() }.into())
}
pub fn path<'a>(ids: impl IntoIterator<Item = &'a str>) -> Result<Query> {
    let ids: Vec<String> = ids.into_iter().map(str::to_string).collect();
    if ids.is_empty() || ids.iter().any(String::is_empty) {
        return Err(CairnError::construction("$path needs at least one non-empty id"));
    }
    Ok(Predicate::Path(ids).into())
}

// ------------- Full text -------------
fn field_text(field: &str, text: &str) -> Result<FieldText> {
    check_field(field)?;
    Ok(FieldText { field: field.to_string(), text: text.to_string() })
}
pub fn match_(field: &str, text: &str) -> Result<Query> {
    Ok(Predicate::Match(field_text(field, text)?).into())
}
pub fn match_phrase(field: &str, text: &str) -> Result<Query> {
    Ok(Predicate::MatchPhrase(field_text(field, text)?).into())
}
pub fn match_phrase_prefix(field: &str, text: &str) -> Result<Query> {
    check_field(field)?;
    Ok(Predicate::MatchPhrasePrefix { field: field.to_string(), text: text.to_string(), max_expansions: None }.into())
}
pub fn search(field: &str, text: &str) -> Result<Query> {
    Ok(Predicate::Search(field_text(field, text)?).into())
}
/// Fuzzy like-this over one or more fields.
pub fn flt<'a>(like: &str, fields: impl IntoIterator<Item = &'a str>) -> Result<Query> {
    let fields = fields_of(fields)?;
    if fields.is_empty() {
        return Err(CairnError::construction("$flt needs at least one field"));
    }
    Ok(Predicate::Flt { fields, like: like.to_string() }.into())
}
pub fn term(field: &str, value: impl Into<Scalar>) -> Result<Query> {
    check_field(field)?;
    Ok(Predicate::Term(vec![(field.to_string(), value.into())]).into())
}

// ------------- Extenders and depth -------------
impl Query {
    /// Appends children to a logical node.
    pub fn add(mut self, children: impl IntoIterator<Item = Query>) -> Result<Query> {
        let op = self.op();
        let list = match self.predicate_mut() {
            Predicate::And(list) | Predicate::Or(list) | Predicate::Not(list) => list,
            _ => return Err(CairnError::construction(format!("{op} does not take child queries"))),
        };
        for child in children {
            if child.depth() != Depth::Implicit {
                return Err(CairnError::construction(format!("a child of {op} cannot carry a depth qualifier")));
            }
            if child.op() == token::QueryOp::Path {
                return Err(CairnError::construction(format!("$path cannot be nested in {op}")));
            }
            list.push(child.into_predicate());
        }
        Ok(self)
    }

    /// Appends a value to `$in` / `$nin`.
    pub fn add_value(mut self, value: impl Into<Scalar>) -> Result<Query> {
        let op = self.op();
        match self.predicate_mut() {
            Predicate::In(fv) | Predicate::Nin(fv) => fv.values.push(value.into()),
            _ => return Err(CairnError::construction(format!("{op} does not take extra values"))),
        }
        Ok(self)
    }

    /// Appends a field/value pair to `$term`.
    pub fn add_term(mut self, field: &str, value: impl Into<Scalar>) -> Result<Query> {
        check_field(field)?;
        let op = self.op();
        match self.predicate_mut() {
            Predicate::Term(terms) => match terms.iter_mut().find(|(f, _)| f == field) {
                Some(existing) => existing.1 = value.into(),
                None => terms.push((field.to_string(), value.into())),
            },
            _ => return Err(CairnError::construction(format!("{op} does not take terms"))),
        }
        Ok(self)
    }

    pub fn set_max_expansions(mut self, max: u64) -> Result<Query> {
        let op = self.op();
        match self.predicate_mut() {
            Predicate::MatchPhrasePrefix { max_expansions, .. } => *max_expansions = Some(max),
            _ => return Err(CairnError::construction(format!("{op} does not take {}", token::MAX_EXPANSIONS))),
        }
        Ok(self)
    }

    fn with_depth(mut self, depth: Depth) -> Result<Query> {
        if self.op() == token::QueryOp::Path {
            return Err(CairnError::construction("$path cannot carry a depth qualifier"));
        }
        self.set_depth(depth);
        Ok(self)
    }
    /// Same as [`Query::set_relative_depth_limit`].
    pub fn set_depth_limit(self, depth: i64) -> Result<Query> {
        self.with_depth(Depth::Relative(depth))
    }
    pub fn set_relative_depth_limit(self, depth: i64) -> Result<Query> {
        self.with_depth(Depth::Relative(depth))
    }
    pub fn set_exact_depth_limit(self, depth: u64) -> Result<Query> {
        self.with_depth(Depth::Exact(depth))
    }
}

// ------------- Actions -------------
fn number(field: &str, value: impl Into<Value>) -> Result<Number> {
    match value.into() {
        Value::Number(n) => Ok(n),
        other => Err(CairnError::construction(format!("{field} expects a number, found {other}"))),
    }
}

fn each(value: Value) -> Vec<Value> {
    match value {
        Value::Array(values) => values,
        single => vec![single],
    }
}

pub fn set(field: &str, value: impl Into<Value>) -> Result<Action> {
    action::check_target(field)?;
    Ok(Action::Set(vec![(field.to_string(), value.into())]))
}
pub fn unset<'a>(fields: impl IntoIterator<Item = &'a str>) -> Result<Action> {
    let fields: Vec<String> = fields.into_iter().map(str::to_string).collect();
    if fields.is_empty() {
        return Err(CairnError::construction("$unset needs at least one field"));
    }
    fields.iter().try_for_each(|f| action::check_target(f))?;
    Ok(Action::Unset(fields))
}
pub fn inc(field: &str, by: impl Into<Value>) -> Result<Action> {
    action::check_target(field)?;
    Ok(Action::Inc(vec![(field.to_string(), number(field, by)?)]))
}
pub fn min(field: &str, value: impl Into<Value>) -> Result<Action> {
    action::check_target(field)?;
    Ok(Action::Min(vec![(field.to_string(), number(field, value)?)]))
}
pub fn max(field: &str, value: impl Into<Value>) -> Result<Action> {
    action::check_target(field)?;
    Ok(Action::Max(vec![(field.to_string(), number(field, value)?)]))
}
pub fn rename(field: &str, to: &str) -> Result<Action> {
    action::check_target(field)?;
    action::check_target(to)?;
    Ok(Action::Rename(vec![(field.to_string(), to.to_string())]))
}
/// Values may be a single value or an array of them.
pub fn push(field: &str, values: impl Into<Value>) -> Result<Action> {
    action::check_target(field)?;
    Ok(Action::Push(vec![(field.to_string(), each(values.into()))]))
}
pub fn add(field: &str, values: impl Into<Value>) -> Result<Action> {
    action::check_target(field)?;
    Ok(Action::Add(vec![(field.to_string(), each(values.into()))]))
}
pub fn pull(field: &str, values: impl Into<Value>) -> Result<Action> {
    action::check_target(field)?;
    Ok(Action::Pull(vec![(field.to_string(), each(values.into()))]))
}
pub fn pop(field: &str, end: PopEnd) -> Result<Action> {
    action::check_target(field)?;
    Ok(Action::Pop(vec![(field.to_string(), end)]))
}

impl Action {
    /// Adds one more field to the action, with the value shaped as its constructor expects.
    pub fn add(mut self, field: &str, value: impl Into<Value>) -> Result<Action> {
        action::check_target(field)?;
        let value = value.into();
        match &mut self {
            Action::Set(pairs) => pairs.push((field.to_string(), value)),
            Action::Unset(fields) => fields.push(field.to_string()),
            Action::Inc(pairs) | Action::Min(pairs) | Action::Max(pairs) => {
                pairs.push((field.to_string(), number(field, value)?))
            }
            Action::Rename(pairs) => match value {
                Value::String(to) => {
                    action::check_target(&to)?;
                    pairs.push((field.to_string(), to))
                }
                other => return Err(CairnError::construction(format!("$rename of {field} expects a name, found {other}"))),
            },
            Action::Push(pairs) | Action::Add(pairs) | Action::Pull(pairs) => {
                match pairs.iter_mut().find(|(f, _)| f == field) {
                    Some(existing) => existing.1.extend(each(value)),
                    None => pairs.push((field.to_string(), each(value))),
                }
            }
            Action::Pop(pairs) => {
                let end = value.as_i64().and_then(PopEnd::from_i64).ok_or_else(|| {
                    CairnError::construction(format!("$pop of {field} expects 1 or -1"))
                })?;
                pairs.push((field.to_string(), end))
            }
        }
        Ok(self)
    }
}

// ------------- Facets -------------
pub fn terms_facet(name: &str, field: &str, size: u64, order: FacetOrder) -> Result<Facet> {
    check_field(field)?;
    Facet::new(name, FacetKind::Terms { field: field.to_string(), size, order })
}
pub fn date_range_facet(name: &str, field: &str, format: &str, ranges: Vec<DateBucket>) -> Result<Facet> {
    check_field(field)?;
    Facet::new(name, FacetKind::DateRange { field: field.to_string(), format: format.to_string(), ranges })
}
/// Each filter is a named nested query: no `$path`, no depth qualifier.
pub fn filters_facet<'a>(name: &str, filters: impl IntoIterator<Item = (&'a str, Query)>) -> Result<Facet> {
    let filters = filters
        .into_iter()
        .map(|(filter_name, query)| {
            if query.op() == token::QueryOp::Path {
                return Err(CairnError::construction(format!("filter {filter_name} cannot be a $path")));
            }
            if query.depth() != Depth::Implicit {
                return Err(CairnError::construction(format!("filter {filter_name} cannot carry a depth qualifier")));
            }
            if let Some(op) = query.predicate().find_empty_logical() {
                return Err(CairnError::construction(format!("{op} in filter {filter_name} needs at least one child query")));
            }
            Ok((filter_name.to_string(), query.into_predicate()))
        })
        .collect::<Result<Vec<_>>>()?;
    Facet::new(name, FacetKind::Filters { filters })
}

// ------------- Requests -------------
/// Parts every request shares.
#[derive(Debug, Clone, Default)]
pub struct RequestCore {
    roots: BTreeSet<String>,
    queries: Vec<Query>,
    filter: Filter,
}

impl RequestCore {
    fn request(&self, body: Body) -> Result<Request> {
        let last_depth = depth::last_depth(&self.queries).map_err(CairnError::into_construction)?;
        Ok(Request::new(self.roots.clone(), self.queries.clone(), self.filter.clone(), body, last_depth))
    }
}

/// Operations shared by the four request builders.
pub trait RequestBuilder: Sized {
    fn core(&self) -> &RequestCore;
    fn core_mut(&mut self) -> &mut RequestCore;
    fn build(&self) -> Result<Request>;

    fn add_roots<'a>(&mut self, roots: impl IntoIterator<Item = &'a str>) -> Result<&mut Self> {
        for root in roots {
            if root.is_empty() {
                return Err(CairnError::construction("root id cannot be empty"));
            }
            self.core_mut().roots.insert(root.to_string());
        }
        Ok(self)
    }

    /// Appends root queries in order. `$path` must come first.
    fn add_queries(&mut self, queries: impl IntoIterator<Item = Query>) -> Result<&mut Self> {
        for query in queries {
            if let Some(op) = query.predicate().find_empty_logical() {
                return Err(CairnError::construction(format!("{op} needs at least one child query")));
            }
            if query.op() == token::QueryOp::Path && !self.core().queries.is_empty() {
                return Err(CairnError::construction("$path is only allowed as the first query"));
            }
            self.core_mut().queries.push(query);
        }
        Ok(self)
    }

    fn reset_queries(&mut self) -> &mut Self {
        self.core_mut().queries.clear();
        self
    }

    fn add_hint_filter<'a>(&mut self, hints: impl IntoIterator<Item = &'a str>) -> Result<&mut Self> {
        for hint in hints {
            let hint = FilterHint::from_token(hint)
                .ok_or_else(|| CairnError::construction(format!("unknown hint {hint}")))?;
            self.core_mut().filter.push_hint(hint);
        }
        Ok(self)
    }

    fn reset_hint_filter(&mut self) -> &mut Self {
        self.core_mut().filter.hints = None;
        self
    }

    fn final_json(&self) -> Result<Value> {
        Ok(self.build()?.to_json())
    }
}

/// `$mult` is only meaningful for requests that modify documents.
pub trait MutationBuilder: RequestBuilder {
    fn set_mult(&mut self, mult: bool) -> &mut Self {
        self.core_mut().filter.mult = Some(mult);
        self
    }
}

macro_rules! core_access {
    () => {
        fn core(&self) -> &RequestCore {
            &self.core
        }
        fn core_mut(&mut self) -> &mut RequestCore {
            &mut self.core
        }
    };
}

// ------------- Select -------------
#[derive(Debug, Clone, Default)]
pub struct Select {
    core: RequestCore,
    projection: Projection,
    facets: Vec<Facet>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset is only kept when positive, limit too.
    pub fn set_limit_filter(&mut self, offset: u64, limit: u64) -> &mut Self {
        let filter = &mut self.core.filter;
        filter.offset = (offset > 0).then_some(offset);
        filter.limit = (limit > 0).then_some(limit);
        self
    }
    pub fn reset_limit_filter(&mut self) -> &mut Self {
        self.core.filter.offset = None;
        self.core.filter.limit = None;
        self
    }
    fn order_by<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>, order: SortOrder) -> Result<&mut Self> {
        for field in fields {
            check_field(field)?;
            self.core.filter.push_order(field, order);
        }
        Ok(self)
    }
    pub fn add_order_by_asc_filter<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) -> Result<&mut Self> {
        self.order_by(fields, SortOrder::Asc)
    }
    pub fn add_order_by_desc_filter<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) -> Result<&mut Self> {
        self.order_by(fields, SortOrder::Desc)
    }
    pub fn reset_order_by_filter(&mut self) -> &mut Self {
        self.core.filter.order_by = None;
        self
    }

    pub fn add_used_projection<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) -> Result<&mut Self> {
        for field in fields {
            check_field(field)?;
            self.projection.push_field(field, true);
        }
        Ok(self)
    }
    pub fn add_unused_projection<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) -> Result<&mut Self> {
        for field in fields {
            check_field(field)?;
            self.projection.push_field(field, false);
        }
        Ok(self)
    }
    pub fn set_usage_projection(&mut self, usage: &str) -> Result<&mut Self> {
        if usage.is_empty() {
            return Err(CairnError::construction("usage cannot be empty"));
        }
        self.projection.usage = Some(usage.to_string());
        Ok(self)
    }
    pub fn reset_usage_projection(&mut self) -> &mut Self {
        self.projection.usage = None;
        self
    }

    pub fn add_facets(&mut self, facets: impl IntoIterator<Item = Facet>) -> Result<&mut Self> {
        for facet in facets {
            if self.facets.iter().any(|f| f.name() == facet.name()) {
                return Err(CairnError::construction(format!("facet {} is defined twice", facet.name())));
            }
            self.facets.push(facet);
        }
        Ok(self)
    }

    pub fn final_select(&self) -> Result<Value> {
        self.final_json()
    }
}

impl RequestBuilder for Select {
    core_access!();
    fn build(&self) -> Result<Request> {
        self.core.request(Body::Select { projection: self.projection.clone(), facets: self.facets.clone() })
    }
}

// ------------- Update -------------
#[derive(Debug, Clone, Default)]
pub struct Update {
    core: RequestCore,
    actions: Vec<Action>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add_actions(&mut self, actions: impl IntoIterator<Item = Action>) -> Result<&mut Self> {
        for action in actions {
            if action.is_empty() {
                return Err(CairnError::construction(format!("{} has no field", action.op())));
            }
            self.actions.push(action);
        }
        Ok(self)
    }
    pub fn reset_actions(&mut self) -> &mut Self {
        self.actions.clear();
        self
    }
    pub fn final_update(&self) -> Result<Value> {
        self.final_json()
    }
}

impl RequestBuilder for Update {
    core_access!();
    fn build(&self) -> Result<Request> {
        if self.actions.is_empty() {
            return Err(CairnError::construction("an update needs at least one action"));
        }
        self.core.request(Body::Update { actions: self.actions.clone() })
    }
}
impl MutationBuilder for Update {}

// ------------- Insert -------------
#[derive(Debug, Clone, Default)]
pub struct Insert {
    core: RequestCore,
    data: Map<String, Value>,
}

impl Insert {
    pub fn new() -> Self {
        Self::default()
    }
    /// Merges `data` into the document to insert.
    pub fn set_data(&mut self, data: Map<String, Value>) -> Result<&mut Self> {
        check_data(&data).map_err(CairnError::into_construction)?;
        self.data.extend(data);
        Ok(self)
    }
    pub fn reset_data(&mut self) -> &mut Self {
        self.data.clear();
        self
    }
    pub fn final_insert(&self) -> Result<Value> {
        self.final_json()
    }
}

/// Rejects reserved (`#`) and internal (`_`) keys at any depth of inserted data.
pub(crate) fn check_data(data: &Map<String, Value>) -> Result<()> {
    let mut found = Vec::new();
    crate::value::scan_map(data, &|key| key.starts_with('#') || key.starts_with('_'), &mut found);
    match found.first() {
        Some(key) => Err(CairnError::parse(format!("field {key} is reserved and cannot be inserted"))),
        None => Ok(()),
    }
}

impl RequestBuilder for Insert {
    core_access!();
    fn build(&self) -> Result<Request> {
        self.core.request(Body::Insert { data: self.data.clone() })
    }
}
impl MutationBuilder for Insert {}

// ------------- Delete -------------
#[derive(Debug, Clone, Default)]
pub struct Delete {
    core: RequestCore,
}

impl Delete {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn final_delete(&self) -> Result<Value> {
        self.final_json()
    }
}

impl RequestBuilder for Delete {
    core_access!();
    fn build(&self) -> Result<Request> {
        self.core.request(Body::Delete)
    }
}
impl MutationBuilder for Delete {}
