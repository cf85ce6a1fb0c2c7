use thiserror::Error;

use crate::validator::ValidationReport;

#[derive(Error, Debug)]
pub enum CairnError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Parse error: {message}")]
    Parse { message: String },
    #[error("Invalid construction: {0}")]
    Construction(String),
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Validation failed:\n{0}")]
    Validation(ValidationReport),
    #[error("I/O error: {0}")]
    Io(String),
}

impl CairnError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }
    pub fn construction(message: impl Into<String>) -> Self {
        Self::Construction(message.into())
    }
    /// Reports a parse failure found while building as a construction error.
    pub fn into_construction(self) -> Self {
        match self {
            Self::Parse { message } => Self::Construction(message),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, CairnError>;

// Helper conversions
impl From<serde_json::Error> for CairnError {
    fn from(e: serde_json::Error) -> Self { Self::parse(e.to_string()) }
}
impl From<config::ConfigError> for CairnError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<std::io::Error> for CairnError {
    fn from(e: std::io::Error) -> Self { Self::Io(e.to_string()) }
}
impl From<regex::Error> for CairnError {
    fn from(e: regex::Error) -> Self { Self::construction(format!("invalid regular expression: {e}")) }
}
impl From<ValidationReport> for CairnError {
    fn from(report: ValidationReport) -> Self { Self::Validation(report) }
}
