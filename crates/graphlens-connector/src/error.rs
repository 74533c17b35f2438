use graphlens_core::{IdentityError, TransportError};
use graphlens_query::CompileError;
use serde_json::Value;
use thiserror::Error;

/// Message used when a backend error envelope carries no details
pub const DEFAULT_BACKEND_MESSAGE: &str = "The backend returned an error without details";

/// Errors surfaced by connector operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectorError {
    /// The response does not match the backend's wire schema
    #[error("malformed response: {0}")]
    Validation(String),

    /// The backend answered with an error envelope
    #[error("{message}")]
    Backend { code: Option<String>, message: String },

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("transport failed: {0}")]
    Transport(TransportError),

    #[error("request cancelled")]
    Cancelled,
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

impl ConnectorError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Interpret a `{ code, detailedMessage }` envelope
    ///
    /// Returns `None` for anything that does not look like an error body.
    pub fn from_envelope(body: &Value) -> Option<Self> {
        let object = body.as_object()?;
        let has_details = object.contains_key("detailedMessage");
        let has_code = object.contains_key("code");
        let looks_successful = ["results", "result", "head", "boolean"]
            .iter()
            .any(|key| object.contains_key(*key));
        if !has_details && !(has_code && !looks_successful) {
            return None;
        }

        let code = object.get("code").and_then(|code| match code {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        });
        let message = object
            .get("detailedMessage")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_BACKEND_MESSAGE)
            .to_string();

        Some(Self::Backend { code, message })
    }
}

impl From<TransportError> for ConnectorError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Cancelled => Self::Cancelled,
            TransportError::Http {
                body: Some(ref body),
                ..
            } => Self::from_envelope(body).unwrap_or(Self::Transport(error)),
            other => Self::Transport(other),
        }
    }
}
