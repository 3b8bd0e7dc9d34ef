//! Error types for the Elasticsearch adapter

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum EsError {
    #[error("Request to index '{index}' timed out after {timeout_ms}ms")]
    Timeout { index: String, timeout_ms: u64 },

    #[error("Elasticsearch returned {status} for index '{index}': {error_type}: {reason}")]
    Status {
        index: String,
        status: u16,
        error_type: String,
        reason: String,
        body: Option<Value>,
    },

    #[error("Transport error for index '{index}': {source}")]
    Transport {
        index: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Malformed response from index '{index}': {reason}")]
    Parse { index: String, reason: String },

    #[error("Invalid engine URL: {0}")]
    InvalidUrl(String),
}

impl EsError {
    /// Elasticsearch-style error type, as reported by the engine when known
    pub fn error_type(&self) -> &str {
        match self {
            Self::Timeout { .. } => "timeout_exception",
            Self::Status { error_type, .. } => error_type,
            Self::Transport { .. } => "transport_exception",
            Self::Parse { .. } => "parse_exception",
            Self::InvalidUrl(_) => "illegal_argument_exception",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<EsError> for quiver::Error {
    fn from(err: EsError) -> Self {
        match err {
            EsError::Timeout { index, timeout_ms } => quiver::Error::EngineTimeout { index, timeout_ms },
            EsError::Status {
                index,
                status,
                error_type,
                reason,
                body,
            } => quiver::Error::EngineQuery {
                index,
                status: Some(status),
                reason: format!("{}: {}", error_type, reason),
                detail: body,
            },
            EsError::Transport { ref index, .. } | EsError::Parse { ref index, .. } => {
                quiver::Error::EngineQuery {
                    index: index.clone(),
                    status: None,
                    reason: err.to_string(),
                    detail: None,
                }
            }
            EsError::InvalidUrl(_) => quiver::Error::Config(err.to_string()),
        }
    }
}
