//! Sanity limits applied while parsing requests.
//!
//! Limits are layered: built-in defaults, then an optional file
//! (`cairn.toml` unless another path is given), then `CAIRN_*`
//! environment variables (for example `CAIRN_LIMIT_LOAD=500`).

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_CONFIG_FILE: &str = "cairn";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Limits {
    /// Maximum length of a serialized request.
    pub limit_request: usize,
    /// Default `$limit` of a select when none (or zero) is given.
    pub limit_load: u64,
    /// Maximum length of a string operand.
    pub limit_value: usize,
    /// Maximum length of a field name or a hint.
    pub limit_parameter: usize,
    pub max_roots: usize,
    pub max_queries: usize,
    pub max_actions: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            limit_request: 1_000_000,
            limit_load: 10_000,
            limit_value: 100_000,
            limit_parameter: 1_000,
            max_roots: 1_000,
            max_queries: 1_000,
            max_actions: 1_000,
        }
    }
}

impl Limits {
    /// Loads the limits, the file part being optional.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("limit_request", defaults.limit_request as u64)?
            .set_default("limit_load", defaults.limit_load)?
            .set_default("limit_value", defaults.limit_value as u64)?
            .set_default("limit_parameter", defaults.limit_parameter as u64)?
            .set_default("max_roots", defaults.max_roots as u64)?
            .set_default("max_queries", defaults.max_queries as u64)?
            .set_default("max_actions", defaults.max_actions as u64)?
            .add_source(File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE)).required(path.is_some()))
            .add_source(Environment::with_prefix("CAIRN").try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
