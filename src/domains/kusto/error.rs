//! Kusto-specific error types.

use serde::Serialize;
use thiserror::Error;

/// Errors raised while building or running a Kusto query.
#[derive(Debug, Error)]
pub enum KustoError {
    /// A query parameter was rejected before anything was sent.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The query is not allowed by the configured query policy.
    #[error("Query rejected by policy: {0}")]
    PolicyViolation(String),

    /// Token acquisition failed or the cluster refused the credentials.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Connection-level failure talking to the cluster.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request exceeded the configured timeout.
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// The cluster rejected or failed the query (syntax, semantic, limits).
    #[error("Query failed ({code}): {message}")]
    Query { code: String, message: String },

    /// The response could not be interpreted.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Error payload returned to tool callers in place of rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteErrorPayload {
    pub error_message: String,
    pub error_kind: String,
}

impl KustoError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn policy(msg: impl Into<String>) -> Self {
        Self::PolicyViolation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Whether the error was detected locally, before contacting the cluster.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::InvalidParameter(_) | Self::PolicyViolation(_))
    }

    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }

    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParameter(_) => "InvalidParameter",
            Self::PolicyViolation(_) => "PolicyViolation",
            Self::Authentication(_) => "AuthenticationError",
            Self::Transport(_) => "TransportError",
            Self::Timeout(_) => "Timeout",
            Self::Query { .. } => "QueryError",
            Self::InvalidResponse(_) => "InvalidResponse",
        }
    }

    /// Convert into the payload sent back to the caller.
    pub fn to_payload(&self) -> RemoteErrorPayload {
        RemoteErrorPayload {
            error_message: self.to_string(),
            error_kind: self.kind().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_serialization() {
        let err = KustoError::Query {
            code: "General_BadRequest".to_string(),
            message: "Syntax error".to_string(),
        };
        let json = serde_json::to_value(err.to_payload()).unwrap();
        assert_eq!(json["errorKind"], "QueryError");
        assert_eq!(
            json["errorMessage"],
            "Query failed (General_BadRequest): Syntax error"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(KustoError::invalid_parameter("x").is_local());
        assert!(KustoError::policy("x").is_local());
        assert!(!KustoError::transport("x").is_local());
        assert!(KustoError::Timeout(5).is_retryable());
        assert!(!KustoError::authentication("x").is_retryable());
    }
}
