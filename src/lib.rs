//! Cairn – a query DSL compiler for a digital-archiving back office.
//!
//! Requests are JSON documents made of roots, an ordered chain of queries,
//! a filter and a kind specific body:
//!
//! ```json
//! { "$roots": ["id0"],
//!   "$query": [ {"$path": ["id1", "id2"]},
//!               {"$and": [{"$exists": "Title"}], "$exactdepth": 4},
//!               {"$match": {"Description": "annual report"}, "$depth": 1} ],
//!   "$filter": {"$offset": 100, "$limit": 1000, "$hint": ["cache"]},
//!   "$projection": {"$fields": {"Title": 1}, "$usage": "BinaryMaster"} }
//! ```
//!
//! The crate turns such documents into a typed [`request::Request`] and back:
//! * a [`request::Request`] is built either fluently with the [`builder`] or
//!   from JSON with the [`parser::RequestParser`], and always serializes to
//!   the same canonical form,
//! * queries are scoped by depth: each one is relative to the previous
//!   match unless it carries `$exactdepth` (see [`depth`]),
//! * requests using a text-search operator are flagged so that they can be
//!   routed to a capable backend.
//!
//! ## Modules
//! * [`token`] – The closed catalogue of operators, actions, hints and envelope keys.
//! * [`value`] – Scalar operands, including `{"$date": ..}` timestamps.
//! * [`query`], [`action`], [`facet`] – The request AST.
//! * [`depth`] – Depth chaining over the ordered query list.
//! * [`request`] – The immutable request model, filter and projection.
//! * [`builder`] – Fluent construction with immediate operand checks.
//! * [`parser`] – JSON to request, with sanity limits from [`config`].
//! * [`schema`], [`typexpr`], [`validator`] – A data driven structural validator.
//!   Grammar details of type expressions live in `typexpr.pest`.
//! * [`catalog`] – The bundled schema describing every request shape.
//!
//! ## Quick Start
//! ```
//! use cairn::parser::RequestParser;
//! let mut parser = RequestParser::default();
//! let request = parser
//!     .parse(r#"{"$query": [{"$eq": {"Title": "Minutes"}}], "$projection": {}}"#)
//!     .unwrap();
//! assert_eq!(parser.last_depth(), 1);
//! assert!(!parser.has_full_text_query());
//! assert_eq!(request.filter().limit(), Some(10_000));
//! ```
//!
//! Structural validation against the bundled catalog can run first, to
//! report every problem of a malformed request at once:
//! ```
//! use cairn::{catalog, request::RequestKind};
//! let request = serde_json::json!({"$query": [{"$exists": {}}], "$projection": {}});
//! assert!(catalog::validate_request(RequestKind::Select, &request).is_err());
//! ```

pub mod action;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod depth;
pub mod error;
pub mod facet;
pub mod parser;
pub mod query;
pub mod request;
pub mod schema;
pub mod token;
pub mod typexpr;
pub mod validator;
pub mod value;

pub use error::{CairnError, Result};
pub use parser::RequestParser;
pub use query::{Predicate, Query};
pub use request::{Request, RequestKind};
pub use schema::Schema;
pub use validator::{ValidationReport, Validator};
