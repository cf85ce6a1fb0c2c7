//! Depth chaining over the ordered query list.
//!
//! Each root query is scoped relative to the one before it. The running
//! depth starts at 0 and is folded over the list:
//! * `$exactdepth: n` sets it to `n`,
//! * `$depth: d` adds `d`,
//! * no qualifier adds 1,
//! * `$path: [ids]` (first query only) sets it to the number of ids.
//!
//! A negative running depth is an error.

use tracing::debug;

use crate::error::{CairnError, Result};
use crate::query::{Depth, Predicate, Query};

/// Running depth while walking the query list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DepthCursor {
    last: i64,
    position: usize,
}

impl DepthCursor {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn last_depth(&self) -> i64 {
        self.last
    }

    /// Advances past `query` and returns its effective depth.
    pub fn step(self, query: &Query) -> Result<(Self, i64)> {
        let effective = match (query.predicate(), query.depth()) {
            (Predicate::Path(ids), depth) => {
                if self.position > 0 {
                    return Err(CairnError::parse("$path is only allowed as the first query"));
                }
                if depth != Depth::Implicit {
                    return Err(CairnError::parse("$path cannot carry a depth qualifier"));
                }
                i64::try_from(ids.len()).ok().and_then(|n| self.last.checked_add(n))
            }
            (_, Depth::Exact(exact)) => i64::try_from(exact).ok(),
            (_, Depth::Relative(relative)) => self.last.checked_add(relative),
            (_, Depth::Implicit) => self.last.checked_add(1),
        };
        let effective = effective
            .ok_or_else(|| CairnError::parse(format!("query {}: depth out of range", self.position)))?;
        if effective < 0 {
            return Err(CairnError::parse(format!(
                "query {} resolves to a negative depth ({effective})",
                self.position
            )));
        }
        debug!(position = self.position, op = %query.op(), depth = effective, "depth step");
        Ok((Self { last: effective, position: self.position + 1 }, effective))
    }
}

/// Effective depth of every query, in order.
pub fn resolve_chain(queries: &[Query]) -> Result<Vec<i64>> {
    let mut cursor = DepthCursor::new();
    let mut depths = Vec::with_capacity(queries.len());
    for query in queries {
        let (next, effective) = cursor.step(query)?;
        depths.push(effective);
        cursor = next;
    }
    Ok(depths)
}

/// Depth of the last query, 0 for an empty list.
pub fn last_depth(queries: &[Query]) -> Result<i64> {
    Ok(resolve_chain(queries)?.last().copied().unwrap_or(0))
}
