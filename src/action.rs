//! Mutation actions carried by update requests.

use std::fmt;

use serde_json::{Map, Number, Value};

use crate::error::{CairnError, Result};
use crate::token::{self, ActionOp};

/// Technical fields that updates may still target.
pub const MUTABLE_TECHNICAL_PREFIX: &str = "#management";

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Set(Vec<(String, Value)>),
    Unset(Vec<String>),
    Inc(Vec<(String, Number)>),
    Min(Vec<(String, Number)>),
    Max(Vec<(String, Number)>),
    Rename(Vec<(String, String)>),
    Push(Vec<(String, Vec<Value>)>),
    Add(Vec<(String, Vec<Value>)>),
    Pop(Vec<(String, PopEnd)>),
    Pull(Vec<(String, Vec<Value>)>),
}

/// Which end of an array `$pop` removes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopEnd {
    First,
    Last,
}

impl PopEnd {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            -1 => Some(PopEnd::First),
            1 => Some(PopEnd::Last),
            _ => None,
        }
    }
    pub fn as_i64(&self) -> i64 {
        match self {
            PopEnd::First => -1,
            PopEnd::Last => 1,
        }
    }
}

/// Checks that `field` may be the target of a mutation.
///
/// `#`-prefixed technical fields are only mutable under `#management`, and
/// `_`-prefixed fields belong to the store.
pub fn check_target(field: &str) -> Result<()> {
    if field.is_empty() {
        return Err(CairnError::construction("an action needs a non-empty field name"));
    }
    if field.starts_with('_') {
        return Err(CairnError::construction(format!("field {field} is internal and cannot be updated")));
    }
    if field.starts_with('#') {
        let whitelisted = field == MUTABLE_TECHNICAL_PREFIX
            || field.strip_prefix(MUTABLE_TECHNICAL_PREFIX).is_some_and(|rest| rest.starts_with('.'));
        if !whitelisted {
            return Err(CairnError::construction(format!("field {field} is reserved and cannot be updated")));
        }
    }
    Ok(())
}

impl Action {
    pub fn op(&self) -> ActionOp {
        match self {
            Action::Set(_) => ActionOp::Set,
            Action::Unset(_) => ActionOp::Unset,
            Action::Inc(_) => ActionOp::Inc,
            Action::Min(_) => ActionOp::Min,
            Action::Max(_) => ActionOp::Max,
            Action::Rename(_) => ActionOp::Rename,
            Action::Push(_) => ActionOp::Push,
            Action::Add(_) => ActionOp::Add,
            Action::Pop(_) => ActionOp::Pop,
            Action::Pull(_) => ActionOp::Pull,
        }
    }

    /// Every field this action mutates. Renames contribute both names.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Action::Set(pairs) => pairs.iter().map(|(f, _)| f.as_str()).collect(),
            Action::Unset(fields) => fields.iter().map(String::as_str).collect(),
            Action::Inc(pairs) | Action::Min(pairs) | Action::Max(pairs) => {
                pairs.iter().map(|(f, _)| f.as_str()).collect()
            }
            Action::Rename(pairs) => pairs.iter().flat_map(|(from, to)| [from.as_str(), to.as_str()]).collect(),
            Action::Push(pairs) | Action::Add(pairs) | Action::Pull(pairs) => {
                pairs.iter().map(|(f, _)| f.as_str()).collect()
            }
            Action::Pop(pairs) => pairs.iter().map(|(f, _)| f.as_str()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.targets().is_empty()
    }

    pub fn operand(&self) -> Value {
        match self {
            Action::Set(pairs) => Value::Object(pairs.iter().cloned().collect()),
            Action::Unset(fields) => Value::Array(fields.iter().cloned().map(Value::String).collect()),
            Action::Inc(pairs) | Action::Min(pairs) | Action::Max(pairs) => Value::Object(
                pairs.iter().map(|(f, n)| (f.clone(), Value::Number(n.clone()))).collect(),
            ),
            Action::Rename(pairs) => Value::Object(
                pairs.iter().map(|(from, to)| (from.clone(), Value::String(to.clone()))).collect(),
            ),
            Action::Push(pairs) | Action::Add(pairs) | Action::Pull(pairs) => Value::Object(
                pairs
                    .iter()
                    .map(|(f, values)| {
                        let mut each = Map::new();
                        each.insert(token::EACH.to_string(), Value::Array(values.clone()));
                        (f.clone(), Value::Object(each))
                    })
                    .collect(),
            ),
            Action::Pop(pairs) => Value::Object(
                pairs.iter().map(|(f, end)| (f.clone(), Value::from(end.as_i64()))).collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut node = Map::new();
        node.insert(self.op().token().to_string(), self.operand());
        Value::Object(node)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
