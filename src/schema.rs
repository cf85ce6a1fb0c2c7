//! Schema meta-model: named formats referencing each other by id.
//!
//! A schema document is a JSON object mapping type names to definitions.
//! A definition is either a type expression (see [`crate::typexpr`]) or an
//! object with one of the keys below:
//!
//! | key       | meaning                                                        |
//! |-----------|----------------------------------------------------------------|
//! | `object`  | fixed fields, `name?` marks an optional one                    |
//! | `choice`  | exactly one of the keys (`"optional": true` also allows none)  |
//! |           | or the name of a choice defined earlier, to reuse its keys     |
//! | `union`   | the keys of an object are shared out among the member types    |
//! | `map`     | any key, values of the given type                              |
//! | `pattern` | a string matching the regular expression                       |
//! | `enum`    | one of the listed values                                       |
//! | `range`   | a number between `min` and `max`                               |
//!
//! `object` and `map` also accept `min` / `max` key counts, and every
//! definition an optional `hint`. Built-in types are `string`, `integer`,
//! `posinteger`, `number`, `boolean`, `null` and `any`.
//!
//! Formats live in an arena owned by the [`Schema`]; a name index maps type
//! names (and the signatures of anonymous inline types) to [`FormatId`]s.
//! Once built a schema never changes.

use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasherDefault;

use ::regex::Regex;
use seahash::SeaHasher;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{CairnError, Result};
use crate::typexpr::{self, TypeExpr};

pub type OtherHasher = BuildHasherDefault<SeaHasher>;

const OPTIONAL_MARK: char = '?';

// ------------- Format -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormatId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    Any,
}

impl ScalarKind {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ScalarKind::String => value.is_string(),
            ScalarKind::Integer => value.is_i64() || value.is_u64(),
            ScalarKind::Number => value.is_number(),
            ScalarKind::Boolean => value.is_boolean(),
            ScalarKind::Null => value.is_null(),
            ScalarKind::Any => true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ValueDomain {
    Enum(Vec<Value>),
    Pattern(Regex),
    Range { min: Option<f64>, max: Option<f64> },
}

impl ValueDomain {
    pub fn contains(&self, value: &Value) -> bool {
        match self {
            ValueDomain::Enum(values) => values.contains(value),
            ValueDomain::Pattern(pattern) => value.as_str().is_some_and(|s| pattern.is_match(s)),
            ValueDomain::Range { min, max } => value.as_f64().is_some_and(|n| {
                min.is_none_or(|min| n >= min) && max.is_none_or(|max| n <= max)
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldFormat {
    pub name: String,
    pub format: FormatId,
    pub required: bool,
}

#[derive(Debug, Clone)]
pub enum FormatKind {
    Scalar { scalar: ScalarKind, domain: Option<ValueDomain> },
    Object { fields: Vec<FieldFormat>, min: Option<usize>, max: Option<usize> },
    Map { value: FormatId, min: Option<usize>, max: Option<usize> },
    Array { element: FormatId, min: Option<usize>, max: Option<usize> },
    Choice { choices: Vec<(String, FormatId)>, optional: bool },
    Union { members: Vec<FormatId> },
    OneOf { alternatives: Vec<FormatId> },
    Alias(FormatId),
}

#[derive(Debug, Clone)]
pub struct Format {
    name: String,
    kind: FormatKind,
    hint: Option<String>,
}

impl Format {
    /// Type name, or the signature of an anonymous inline type.
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> &FormatKind {
        &self.kind
    }
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }
}

// ------------- Keeper -------------
// Owns formats while the schema is built and guarantees one id per name.
#[derive(Debug, Default)]
struct FormatKeeper {
    slots: Vec<Option<Format>>,
    index: HashMap<String, FormatId, OtherHasher>,
}

impl FormatKeeper {
    /// Reserves an id for `name`, telling whether it was already kept.
    fn keep(&mut self, name: &str) -> (FormatId, bool) {
        if let Some(id) = self.index.get(name) {
            return (*id, true);
        }
        let id = FormatId(self.slots.len());
        self.slots.push(None);
        self.index.insert(name.to_string(), id);
        (id, false)
    }
    fn get(&self, id: FormatId) -> Option<&Format> {
        self.slots[id.0].as_ref()
    }
    fn fill(&mut self, id: FormatId, format: Format) {
        self.slots[id.0] = Some(format);
    }
    fn lookup(&self, name: &str) -> Result<FormatId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| CairnError::Schema(format!("unknown type {name}")))
    }
}

const BUILTINS: &[(&str, ScalarKind)] = &[
    ("string", ScalarKind::String),
    ("integer", ScalarKind::Integer),
    ("posinteger", ScalarKind::Integer),
    ("number", ScalarKind::Number),
    ("boolean", ScalarKind::Boolean),
    ("null", ScalarKind::Null),
    ("any", ScalarKind::Any),
];

// ------------- Schema -------------
#[derive(Debug, Clone)]
pub struct Schema {
    formats: Vec<Format>,
    index: HashMap<String, FormatId, OtherHasher>,
}

impl Schema {
    pub fn parse(text: &str) -> Result<Schema> {
        let document: Value =
            serde_json::from_str(text).map_err(|e| CairnError::Schema(format!("schema is not valid JSON: {e}")))?;
        Self::from_json(&document)
    }

    pub fn from_json(document: &Value) -> Result<Schema> {
        let definitions = document
            .as_object()
            .ok_or_else(|| CairnError::Schema("a schema document is an object of type definitions".to_string()))?;
        let mut keeper = FormatKeeper::default();
        for (name, scalar) in BUILTINS {
            let (id, _) = keeper.keep(name);
            let domain = (*name == "posinteger").then_some(ValueDomain::Range { min: Some(0.0), max: None });
            keeper.fill(id, Format { name: name.to_string(), kind: FormatKind::Scalar { scalar: *scalar, domain }, hint: None });
        }
        // names first, so definitions may refer to each other in any order
        let mut named = Vec::with_capacity(definitions.len());
        for name in definitions.keys() {
            let (id, previously_kept) = keeper.keep(name);
            if previously_kept {
                return Err(CairnError::Schema(format!("type {name} is defined twice or shadows a built-in")));
            }
            named.push(id);
        }
        for ((name, definition), id) in definitions.iter().zip(named) {
            let (kind, hint) = Self::compile_definition(&mut keeper, name, definition)?;
            keeper.fill(id, Format { name: name.clone(), kind, hint });
        }
        let formats = keeper
            .slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.ok_or_else(|| CairnError::Schema(format!("type #{i} was never defined"))))
            .collect::<Result<Vec<_>>>()?;
        let schema = Schema { formats, index: keeper.index };
        schema.check_self_containment()?;
        debug!(types = definitions.len(), formats = schema.formats.len(), "schema built");
        Ok(schema)
    }

    fn compile_definition(keeper: &mut FormatKeeper, name: &str, definition: &Value) -> Result<(FormatKind, Option<String>)> {
        let entry = match definition {
            Value::String(expression) => return Ok((Self::compile_expression(keeper, &TypeExpr::parse(expression)?)?, None)),
            Value::Object(entry) => entry,
            other => return Err(CairnError::Schema(format!("definition of {name} must be a string or an object, found {other}"))),
        };
        let hint = entry.get("hint").and_then(Value::as_str).map(str::to_string);
        let count = |key: &str| -> Result<Option<usize>> {
            match entry.get(key) {
                None => Ok(None),
                Some(v) => v
                    .as_u64()
                    .map(|n| Some(n as usize))
                    .ok_or_else(|| CairnError::Schema(format!("{key} of {name} must be a non-negative integer"))),
            }
        };
        let (min, max) = (count("min")?, count("max")?);
        let expression = |keeper: &mut FormatKeeper, value: &Value| -> Result<FormatId> {
            let text = value
                .as_str()
                .ok_or_else(|| CairnError::Schema(format!("{name} refers to a type with {value}, expected a type expression")))?;
            Self::intern(keeper, &TypeExpr::parse(text)?)
        };
        let kind = if let Some(fields) = entry.get("object") {
            let fields = Self::definition_map(name, "object", fields)?;
            let fields = fields
                .iter()
                .map(|(key, value)| {
                    let (field, required) = match key.strip_suffix(OPTIONAL_MARK) {
                        Some(field) => (field.to_string(), false),
                        None => (key.clone(), true),
                    };
                    Ok(FieldFormat { name: field, format: expression(keeper, value)?, required })
                })
                .collect::<Result<Vec<_>>>()?;
            FormatKind::Object { fields, min, max }
        } else if let Some(choices) = entry.get("choice") {
            let choices = match choices {
                // the keys of another, already defined, choice
                Value::String(base) => match keeper.get(keeper.lookup(base)?).map(Format::kind) {
                    Some(FormatKind::Choice { choices, .. }) => choices.clone(),
                    _ => return Err(CairnError::Schema(format!("choice of {name} must name a choice defined before it"))),
                },
                other => Self::definition_map(name, "choice", other)?
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), expression(keeper, value)?)))
                    .collect::<Result<Vec<_>>>()?,
            };
            let optional = entry.get("optional").and_then(Value::as_bool).unwrap_or(false);
            FormatKind::Choice { choices, optional }
        } else if let Some(members) = entry.get("union") {
            let members = members
                .as_array()
                .ok_or_else(|| CairnError::Schema(format!("union of {name} must be an array of types")))?
                .iter()
                .map(|member| expression(keeper, member))
                .collect::<Result<Vec<_>>>()?;
            FormatKind::Union { members }
        } else if let Some(value) = entry.get("map") {
            FormatKind::Map { value: expression(keeper, value)?, min, max }
        } else if let Some(pattern) = entry.get("pattern") {
            let pattern = pattern
                .as_str()
                .ok_or_else(|| CairnError::Schema(format!("pattern of {name} must be a string")))?;
            let pattern = Regex::new(pattern).map_err(|e| CairnError::Schema(format!("invalid pattern for {name}: {e}")))?;
            FormatKind::Scalar { scalar: ScalarKind::String, domain: Some(ValueDomain::Pattern(pattern)) }
        } else if let Some(values) = entry.get("enum") {
            let values = values
                .as_array()
                .filter(|values| !values.is_empty())
                .ok_or_else(|| CairnError::Schema(format!("enum of {name} must be a non-empty array")))?;
            FormatKind::Scalar { scalar: ScalarKind::Any, domain: Some(ValueDomain::Enum(values.clone())) }
        } else if let Some(range) = entry.get("range") {
            let bound = |key: &str| range.get(key).and_then(Value::as_f64);
            FormatKind::Scalar { scalar: ScalarKind::Number, domain: Some(ValueDomain::Range { min: bound("min"), max: bound("max") }) }
        } else {
            return Err(CairnError::Schema(format!("definition of {name} has no known kind")));
        };
        Ok((kind, hint))
    }

    fn definition_map<'a>(name: &str, kind: &str, value: &'a Value) -> Result<&'a Map<String, Value>> {
        value
            .as_object()
            .ok_or_else(|| CairnError::Schema(format!("{kind} of {name} must be an object")))
    }

    /// Kind of a type expression used as a whole definition.
    fn compile_expression(keeper: &mut FormatKeeper, expr: &TypeExpr) -> Result<FormatKind> {
        let kind = match expr {
            TypeExpr::Name(name) => FormatKind::Alias(keeper.lookup(name)?),
            _ if expr.is_enumeration() => {
                let values = match expr {
                    TypeExpr::Alternatives(members) => members
                        .iter()
                        .filter_map(|m| match m {
                            TypeExpr::Literal(v) => Some(v.clone()),
                            _ => None,
                        })
                        .collect(),
                    TypeExpr::Literal(v) => vec![v.clone()],
                    _ => Vec::new(),
                };
                FormatKind::Scalar { scalar: ScalarKind::Any, domain: Some(ValueDomain::Enum(values)) }
            }
            TypeExpr::Literal(_) => return Err(CairnError::Schema(format!("unexpected literal {expr}"))),
            TypeExpr::Array { element, min, max } => {
                FormatKind::Array { element: Self::intern(keeper, element)?, min: *min, max: *max }
            }
            TypeExpr::Map(value) => FormatKind::Map { value: Self::intern(keeper, value)?, min: None, max: None },
            TypeExpr::Alternatives(members) => FormatKind::OneOf {
                alternatives: members.iter().map(|m| Self::intern(keeper, m)).collect::<Result<Vec<_>>>()?,
            },
        };
        Ok(kind)
    }

    /// Id of a type expression; inline types are kept under their signature.
    fn intern(keeper: &mut FormatKeeper, expr: &TypeExpr) -> Result<FormatId> {
        if let TypeExpr::Name(name) = expr {
            return keeper.lookup(name);
        }
        let signature = expr.to_string();
        let (id, previously_kept) = keeper.keep(&signature);
        if !previously_kept {
            let kind = Self::compile_expression(keeper, expr)?;
            keeper.fill(id, Format { name: signature, kind, hint: None });
        }
        Ok(id)
    }

    /// Aliases, unions and alternatives must reach a container or a scalar
    /// before coming back to themselves.
    fn check_self_containment(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            Active,
            Done,
        }
        fn visit(schema: &Schema, id: FormatId, marks: &mut [Mark]) -> Result<()> {
            match marks[id.0] {
                Mark::Done => return Ok(()),
                Mark::Active => {
                    return Err(CairnError::Schema(format!("type {} directly contains itself", schema.format(id).name)));
                }
                Mark::Unvisited => {}
            }
            marks[id.0] = Mark::Active;
            for next in schema.direct_references(id) {
                visit(schema, next, marks)?;
            }
            marks[id.0] = Mark::Done;
            Ok(())
        }
        let mut marks = vec![Mark::Unvisited; self.formats.len()];
        (0..self.formats.len()).try_for_each(|i| visit(self, FormatId(i), &mut marks))
    }

    fn direct_references(&self, id: FormatId) -> Vec<FormatId> {
        match &self.format(id).kind {
            FormatKind::Alias(target) => vec![*target],
            FormatKind::Union { members } => members.clone(),
            FormatKind::OneOf { alternatives } => alternatives.clone(),
            _ => Vec::new(),
        }
    }

    pub fn format(&self, id: FormatId) -> &Format {
        &self.formats[id.0]
    }
    pub fn lookup(&self, name: &str) -> Option<FormatId> {
        self.index.get(name).copied()
    }
    /// Short description of the expected shape, used in validation reports.
    pub fn signature(&self, id: FormatId) -> &str {
        &self.format(id).name
    }
    /// Follows aliases down to the first non-alias format.
    pub fn resolve(&self, mut id: FormatId) -> FormatId {
        while let FormatKind::Alias(target) = self.format(id).kind {
            id = target;
        }
        id
    }
    pub fn len(&self) -> usize {
        self.formats.len()
    }
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FormatKind::Scalar { domain: Some(ValueDomain::Enum(values)), .. } => {
                let literals: Vec<String> = values.iter().map(typexpr::literal_signature).collect();
                write!(f, "{} = {}", self.name, literals.join("|"))
            }
            FormatKind::Scalar { domain: Some(ValueDomain::Pattern(p)), .. } => write!(f, "{} = /{}/", self.name, p.as_str()),
            _ => f.write_str(&self.name),
        }
    }
}
