//! Predicate tree of a request.
//!
//! A [`Query`] is a root predicate plus its depth qualifier. Children of the
//! logical operators are bare [`Predicate`]s, so only roots can be scoped.

use std::fmt;

use serde_json::{Map, Value, json};

use crate::token::{self, QueryOp, RangeBound};
use crate::value::Scalar;

// ------------- Depth -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    /// No qualifier, one level below the previous query.
    #[default]
    Implicit,
    /// `$depth`, relative to the previous query.
    Relative(i64),
    /// `$exactdepth`, absolute.
    Exact(u64),
}

impl Depth {
    fn write_json(&self, node: &mut Map<String, Value>) {
        match self {
            Depth::Implicit => {}
            Depth::Relative(d) => {
                node.insert(token::DEPTH.to_string(), Value::from(*d));
            }
            Depth::Exact(d) => {
                node.insert(token::EXACT_DEPTH.to_string(), Value::from(*d));
            }
        }
    }
}

// ------------- Operands -------------
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub field: String,
    pub value: Scalar,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldText {
    pub field: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldValues {
    pub field: String,
    pub values: Vec<Scalar>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeBounds {
    pub field: String,
    pub bounds: Vec<(RangeBound, Scalar)>,
}

// ------------- Predicate -------------
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Vec<Predicate>),
    Exists(String),
    Missing(String),
    IsNull(String),
    Eq(FieldValue),
    Ne(FieldValue),
    Gt(FieldValue),
    Gte(FieldValue),
    Lt(FieldValue),
    Lte(FieldValue),
    Range(RangeBounds),
    In(FieldValues),
    Nin(FieldValues),
    Size { field: String, size: u64 },
    Regex { field: String, pattern: String },
    Path(Vec<String>),
    Match(FieldText),
    MatchPhrase(FieldText),
    MatchPhrasePrefix { field: String, text: String, max_expansions: Option<u64> },
    Search(FieldText),
    Flt { fields: Vec<String>, like: String },
    Term(Vec<(String, Scalar)>),
}

impl Predicate {
    pub fn op(&self) -> QueryOp {
        match self {
            Predicate::And(_) => QueryOp::And,
            Predicate::Or(_) => QueryOp::Or,
            Predicate::Not(_) => QueryOp::Not,
            Predicate::Exists(_) => QueryOp::Exists,
            Predicate::Missing(_) => QueryOp::Missing,
            Predicate::IsNull(_) => QueryOp::IsNull,
            Predicate::Eq(_) => QueryOp::Eq,
            Predicate::Ne(_) => QueryOp::Ne,
            Predicate::Gt(_) => QueryOp::Gt,
            Predicate::Gte(_) => QueryOp::Gte,
            Predicate::Lt(_) => QueryOp::Lt,
            Predicate::Lte(_) => QueryOp::Lte,
            Predicate::Range(_) => QueryOp::Range,
            Predicate::In(_) => QueryOp::In,
            Predicate::Nin(_) => QueryOp::Nin,
            Predicate::Size { .. } => QueryOp::Size,
            Predicate::Regex { .. } => QueryOp::Regex,
            Predicate::Path(_) => QueryOp::Path,
            Predicate::Match(_) => QueryOp::Match,
            Predicate::MatchPhrase(_) => QueryOp::MatchPhrase,
            Predicate::MatchPhrasePrefix { .. } => QueryOp::MatchPhrasePrefix,
            Predicate::Search(_) => QueryOp::Search,
            Predicate::Flt { .. } => QueryOp::Flt,
            Predicate::Term(_) => QueryOp::Term,
        }
    }

    pub fn children(&self) -> &[Predicate] {
        match self {
            Predicate::And(children) | Predicate::Or(children) | Predicate::Not(children) => children,
            _ => &[],
        }
    }

    /// True when this node or any descendant needs a text-search backend.
    pub fn has_full_text(&self) -> bool {
        self.op().is_full_text() || self.children().iter().any(Predicate::has_full_text)
    }

    /// The empty logical node, if any, in this subtree.
    pub(crate) fn find_empty_logical(&self) -> Option<QueryOp> {
        let children = self.children();
        if self.op().family() == token::OperatorFamily::Logical && children.is_empty() {
            return Some(self.op());
        }
        children.iter().find_map(Predicate::find_empty_logical)
    }

    /// Operand of the operator, i.e. the value under its token.
    pub fn operand(&self) -> Value {
        match self {
            Predicate::And(children) | Predicate::Or(children) | Predicate::Not(children) => {
                Value::Array(children.iter().map(Predicate::to_json).collect())
            }
            Predicate::Exists(field) | Predicate::Missing(field) | Predicate::IsNull(field) => {
                Value::String(field.clone())
            }
            Predicate::Eq(fv)
            | Predicate::Ne(fv)
            | Predicate::Gt(fv)
            | Predicate::Gte(fv)
            | Predicate::Lt(fv)
            | Predicate::Lte(fv) => single(&fv.field, fv.value.to_json()),
            Predicate::Range(range) => {
                let bounds: Map<String, Value> = range
                    .bounds
                    .iter()
                    .map(|(bound, value)| (bound.token().to_string(), value.to_json()))
                    .collect();
                single(&range.field, Value::Object(bounds))
            }
            Predicate::In(fv) | Predicate::Nin(fv) => {
                single(&fv.field, Value::Array(fv.values.iter().map(Scalar::to_json).collect()))
            }
            Predicate::Size { field, size } => single(field, Value::from(*size)),
            Predicate::Regex { field, pattern } => single(field, Value::String(pattern.clone())),
            Predicate::Path(ids) => json!(ids),
            Predicate::Match(ft) | Predicate::MatchPhrase(ft) | Predicate::Search(ft) => {
                single(&ft.field, Value::String(ft.text.clone()))
            }
            Predicate::MatchPhrasePrefix { field, text, max_expansions } => {
                let mut operand = Map::new();
                operand.insert(field.clone(), Value::String(text.clone()));
                if let Some(max) = max_expansions {
                    operand.insert(token::MAX_EXPANSIONS.to_string(), Value::from(*max));
                }
                Value::Object(operand)
            }
            Predicate::Flt { fields, like } => {
                let mut operand = Map::new();
                operand.insert(token::FLT_FIELDS.to_string(), json!(fields));
                operand.insert(token::FLT_LIKE.to_string(), Value::String(like.clone()));
                Value::Object(operand)
            }
            Predicate::Term(terms) => Value::Object(
                terms.iter().map(|(field, value)| (field.clone(), value.to_json())).collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut node = Map::new();
        node.insert(self.op().token().to_string(), self.operand());
        Value::Object(node)
    }
}

fn single(field: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(field.to_string(), value);
    Value::Object(map)
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

// ------------- Query -------------
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    predicate: Predicate,
    depth: Depth,
}

impl Query {
    pub fn new(predicate: Predicate, depth: Depth) -> Self {
        Self { predicate, depth }
    }
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
    pub fn depth(&self) -> Depth {
        self.depth
    }
    pub fn op(&self) -> QueryOp {
        self.predicate.op()
    }
    pub fn into_predicate(self) -> Predicate {
        self.predicate
    }
    pub(crate) fn predicate_mut(&mut self) -> &mut Predicate {
        &mut self.predicate
    }
    pub(crate) fn set_depth(&mut self, depth: Depth) {
        self.depth = depth;
    }

    pub fn to_json(&self) -> Value {
        let mut node = Map::new();
        node.insert(self.op().token().to_string(), self.predicate.operand());
        self.depth.write_json(&mut node);
        Value::Object(node)
    }
}

impl From<Predicate> for Query {
    fn from(predicate: Predicate) -> Self {
        Query::new(predicate, Depth::Implicit)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
