use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown field '{field}' at {path}")]
    UnknownField { field: String, path: String },

    #[error("Invalid SQON at {path}: {message}")]
    InvalidSqon { message: String, path: String },

    #[error("Unsupported operator '{op}' at {path}")]
    UnsupportedOperator { op: String, path: String },

    #[error("Operator '{op}' cannot be applied to field '{field}' of type {field_type} at {path}")]
    TypeMismatch {
        op: String,
        field: String,
        field_type: String,
        path: String,
    },

    #[error("Invalid aggregation for facet '{facet}': {message}")]
    InvalidAggregation { facet: String, message: String },

    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("Search engine timed out after {timeout_ms}ms querying index '{index}'")]
    EngineTimeout { index: String, timeout_ms: u64 },

    #[error("Search engine rejected query on index '{index}': {reason}")]
    EngineQuery {
        index: String,
        status: Option<u16>,
        reason: String,
        detail: Option<Value>,
    },

    #[error("Document type not found: {0}")]
    DocumentTypeNotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable error kind for transport-level code mapping and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnknownField { .. } => "unknown_field",
            Error::InvalidSqon { .. } => "invalid_sqon",
            Error::UnsupportedOperator { .. } => "unsupported_operator",
            Error::TypeMismatch { .. } => "type_mismatch",
            Error::InvalidAggregation { .. } => "invalid_aggregation",
            Error::InvalidPagination(_) => "invalid_pagination",
            Error::EngineTimeout { .. } => "engine_timeout",
            Error::EngineQuery { .. } => "engine_query",
            Error::DocumentTypeNotFound(_) => "document_type_not_found",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Yaml(_) => "yaml",
            Error::Json(_) => "json",
        }
    }

    /// Location of the offending SQON node, when the error came from compilation.
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::UnknownField { path, .. }
            | Error::InvalidSqon { path, .. }
            | Error::UnsupportedOperator { path, .. }
            | Error::TypeMismatch { path, .. } => Some(path),
            _ => None,
        }
    }

    /// True for errors raised before any request reached the engine.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownField { .. }
                | Error::InvalidSqon { .. }
                | Error::UnsupportedOperator { .. }
                | Error::TypeMismatch { .. }
                | Error::InvalidAggregation { .. }
                | Error::InvalidPagination(_)
        )
    }

    pub(crate) fn unknown_field(field: impl Into<String>, path: impl Into<String>) -> Self {
        Error::UnknownField {
            field: field.into(),
            path: path.into(),
        }
    }

    pub(crate) fn invalid_sqon(message: impl Into<String>, path: impl Into<String>) -> Self {
        Error::InvalidSqon {
            message: message.into(),
            path: path.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
