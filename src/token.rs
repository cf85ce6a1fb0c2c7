//! Closed catalogue of the DSL tokens.
//!
//! Every token carries its `$` prefix on the wire. Lookups are exact,
//! so `$isnull` is not `$isNull`.

use std::fmt;

/// Prefix shared by every DSL token.
pub const TOKEN_PREFIX: char = '$';

// ------------- Request envelope -------------
pub const ROOTS: &str = "$roots";
pub const QUERY: &str = "$query";
pub const FILTER: &str = "$filter";
pub const PROJECTION: &str = "$projection";
pub const FACETS: &str = "$facets";
pub const ACTION: &str = "$action";
pub const DATA: &str = "$data";

// ------------- Query node qualifiers -------------
pub const DEPTH: &str = "$depth";
pub const EXACT_DEPTH: &str = "$exactdepth";
pub const MAX_EXPANSIONS: &str = "$max_expansions";
pub const FLT_FIELDS: &str = "$fields";
pub const FLT_LIKE: &str = "$like";
pub const EACH: &str = "$each";
pub const DATE: &str = "$date";

// ------------- Filter -------------
pub const OFFSET: &str = "$offset";
pub const LIMIT: &str = "$limit";
pub const HINT: &str = "$hint";
pub const ORDER_BY: &str = "$orderby";
pub const MULT: &str = "$mult";

// ------------- Projection -------------
pub const FIELDS: &str = "$fields";
pub const USAGE: &str = "$usage";

// ------------- Facets -------------
pub const FACET_NAME: &str = "$name";
pub const FACET_FIELD: &str = "$field";
pub const FACET_SIZE: &str = "$size";
pub const FACET_ORDER: &str = "$order";
pub const FACET_FORMAT: &str = "$format";
pub const FACET_RANGES: &str = "$ranges";
pub const FACET_FROM: &str = "$from";
pub const FACET_TO: &str = "$to";
pub const FACET_QUERY_FILTERS: &str = "$query_filters";
pub const FACET_QUERY: &str = "$query";

/// Family an operator belongs to, which decides the shape of its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorFamily {
    Logical,
    UnaryField,
    Comparison,
    Range,
    SetMembership,
    Structural,
    FullText,
}

macro_rules! token_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn token(&self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }

            pub fn from_token(token: &str) -> Option<Self> {
                match token {
                    $($token => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.token())
            }
        }
    };
}

token_enum!(
    /// Predicate operators.
    QueryOp {
        And => "$and",
        Or => "$or",
        Not => "$not",
        Exists => "$exists",
        Missing => "$missing",
        IsNull => "$isNull",
        Eq => "$eq",
        Ne => "$ne",
        Gt => "$gt",
        Gte => "$gte",
        Lt => "$lt",
        Lte => "$lte",
        Range => "$range",
        In => "$in",
        Nin => "$nin",
        Size => "$size",
        Regex => "$regex",
        Path => "$path",
        Match => "$match",
        MatchPhrase => "$match_phrase",
        MatchPhrasePrefix => "$match_phrase_prefix",
        Search => "$search",
        Flt => "$flt",
        Term => "$term",
    }
);

impl QueryOp {
    pub fn family(&self) -> OperatorFamily {
        use QueryOp::*;
        match self {
            And | Or | Not => OperatorFamily::Logical,
            Exists | Missing | IsNull => OperatorFamily::UnaryField,
            Eq | Ne | Gt | Gte | Lt | Lte => OperatorFamily::Comparison,
            Range => OperatorFamily::Range,
            In | Nin => OperatorFamily::SetMembership,
            Size | Regex | Path => OperatorFamily::Structural,
            Match | MatchPhrase | MatchPhrasePrefix | Search | Flt | Term => OperatorFamily::FullText,
        }
    }
    /// True for operators that need a text-search backend.
    pub fn is_full_text(&self) -> bool {
        self.family() == OperatorFamily::FullText
    }
}

token_enum!(
    /// Bounds accepted inside a `$range` operand.
    RangeBound {
        Gt => "$gt",
        Gte => "$gte",
        Lt => "$lt",
        Lte => "$lte",
    }
);

impl RangeBound {
    pub fn is_lower(&self) -> bool {
        matches!(self, RangeBound::Gt | RangeBound::Gte)
    }
}

token_enum!(
    /// Update actions.
    ActionOp {
        Set => "$set",
        Unset => "$unset",
        Inc => "$inc",
        Min => "$min",
        Max => "$max",
        Rename => "$rename",
        Push => "$push",
        Add => "$add",
        Pop => "$pop",
        Pull => "$pull",
    }
);

token_enum!(
    /// Execution hints carried by `$filter.$hint`.
    FilterHint {
        Cache => "cache",
        NoCache => "nocache",
        NoTimeout => "notimeout",
        Units => "units",
        ObjectGroups => "objectgroups",
        Objects => "objects",
    }
);

impl FilterHint {
    /// Hints naming the collection a request targets.
    pub fn is_model(&self) -> bool {
        matches!(self, FilterHint::Units | FilterHint::ObjectGroups | FilterHint::Objects)
    }
}

token_enum!(
    /// Facet commands.
    FacetOp {
        Terms => "$terms",
        DateRange => "$date_range",
        Filters => "$filters",
    }
);
