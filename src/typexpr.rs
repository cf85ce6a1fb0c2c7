//! Inline type expressions of schema documents.
//!
//! Grammar details live in `typexpr.pest`. A parsed [`TypeExpr`] prints
//! back as its signature, which is also the key anonymous formats are
//! interned under.

use std::fmt;

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use serde_json::Value;

use crate::error::{CairnError, Result};

#[derive(Parser)]
#[grammar = "typexpr.pest"]
struct TypeExprParser;

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Name(String),
    Literal(Value),
    Array { element: Box<TypeExpr>, min: Option<usize>, max: Option<usize> },
    Map(Box<TypeExpr>),
    Alternatives(Vec<TypeExpr>),
}

fn malformed(rule: Rule) -> CairnError {
    CairnError::Schema(format!("malformed type expression near {rule:?}"))
}

impl TypeExpr {
    pub fn parse(input: &str) -> Result<TypeExpr> {
        let mut pairs = TypeExprParser::parse(Rule::expr, input)
            .map_err(|e| CairnError::Schema(format!("invalid type expression {input:?}: {e}")))?;
        let expr = pairs.next().ok_or_else(|| malformed(Rule::expr))?;
        let alternatives = expr.into_inner().next().ok_or_else(|| malformed(Rule::expr))?;
        Self::build(alternatives)
    }

    fn build(pair: Pair<Rule>) -> Result<TypeExpr> {
        let rule = pair.as_rule();
        match rule {
            Rule::alternatives => {
                let mut members = pair.into_inner().map(Self::build).collect::<Result<Vec<_>>>()?;
                if members.len() == 1 {
                    members.pop().ok_or_else(|| malformed(rule))
                } else {
                    Ok(TypeExpr::Alternatives(members))
                }
            }
            Rule::postfix => {
                let mut inner = pair.into_inner();
                let mut expr = Self::build(inner.next().ok_or_else(|| malformed(rule))?)?;
                for cardinality in inner {
                    let (min, max) = Self::cardinality(cardinality)?;
                    expr = TypeExpr::Array { element: Box::new(expr), min, max };
                }
                Ok(expr)
            }
            Rule::map_type | Rule::group => {
                let inner = pair.into_inner().next().ok_or_else(|| malformed(rule))?;
                let expr = Self::build(inner)?;
                Ok(if rule == Rule::map_type { TypeExpr::Map(Box::new(expr)) } else { expr })
            }
            Rule::literal => {
                let literal = pair.into_inner().next().ok_or_else(|| malformed(rule))?;
                let text = literal.as_str();
                let value = match literal.as_rule() {
                    Rule::string => Value::String(text.trim_matches('\'').to_string()),
                    Rule::boolean => Value::Bool(text == "true"),
                    _ => serde_json::from_str(text).map_err(|e| CairnError::Schema(format!("invalid literal {text}: {e}")))?,
                };
                Ok(TypeExpr::Literal(value))
            }
            Rule::name => Ok(TypeExpr::Name(pair.as_str().to_string())),
            other => Err(malformed(other)),
        }
    }

    fn cardinality(pair: Pair<Rule>) -> Result<(Option<usize>, Option<usize>)> {
        let Some(bounds) = pair.into_inner().next() else {
            return Ok((None, None));
        };
        let mut numbers = bounds.into_inner().map(|n| {
            n.as_str()
                .parse::<usize>()
                .map_err(|e| CairnError::Schema(format!("invalid cardinality {}: {e}", n.as_str())))
        });
        let min = numbers.next().transpose()?;
        let max = numbers.next().transpose()?;
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(CairnError::Schema(format!("invalid cardinality [{min}..{max}]")));
            }
        }
        Ok((min, max))
    }

    /// True when every alternative is a literal, i.e. an enumeration.
    pub fn is_enumeration(&self) -> bool {
        match self {
            TypeExpr::Literal(_) => true,
            TypeExpr::Alternatives(members) => members.iter().all(|m| matches!(m, TypeExpr::Literal(_))),
            _ => false,
        }
    }
}

pub(crate) fn cardinality_suffix(min: Option<usize>, max: Option<usize>) -> String {
    match (min, max) {
        (None, None) => "[]".to_string(),
        (Some(min), None) => format!("[{min}..]"),
        (min, Some(max)) => format!("[{}..{max}]", min.unwrap_or(0)),
    }
}

pub(crate) fn literal_signature(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{s}'"),
        other => other.to_string(),
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Name(name) => f.write_str(name),
            TypeExpr::Literal(value) => f.write_str(&literal_signature(value)),
            TypeExpr::Array { element, min, max } => match element.as_ref() {
                TypeExpr::Alternatives(_) => write!(f, "({element}){}", cardinality_suffix(*min, *max)),
                _ => write!(f, "{element}{}", cardinality_suffix(*min, *max)),
            },
            TypeExpr::Map(value) => write!(f, "{{[key]: {value}}}"),
            TypeExpr::Alternatives(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
        }
    }
}
