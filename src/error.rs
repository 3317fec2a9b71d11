//! Error types for dispatcher construction and request forwarding.
//!
//! Failures of the call mechanism are raised as [`ForwardError`]. Errors
//! reported by Odoo itself are not errors at this level: they come back inside
//! a well-formed [`RpcEnvelope`](crate::rpc::RpcEnvelope).

use thiserror::Error;

/// Errors raised while building a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("endpoint root must not be empty")]
    EmptyEndpoint,

    #[error("API key must not be empty")]
    EmptyCredential,

    /// No transport was injected and none could be resolved from the platform.
    #[error("no HTTP transport available: {0}")]
    NoTransport(String),
}

/// Why a parsed body is not a JSON-RPC envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("missing \"jsonrpc\" field")]
    MissingVersion,

    #[error("\"jsonrpc\" must be \"2.0\", got {0}")]
    WrongVersion(String),

    #[error("missing \"id\" field")]
    MissingId,
}

/// Snapshot of an out-of-contract HTTP response, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    /// Up to [`BODY_EXCERPT_CHARS`](crate::dispatcher::BODY_EXCERPT_CHARS)
    /// characters of the body, when it could be read.
    pub body_excerpt: Option<String>,
}

/// Failures of a single forwarded call.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The network exchange failed or the proxy answered outside its contract.
    #[error("{message}")]
    Transport {
        message: String,
        status: Option<u16>,
        status_text: Option<String>,
        response: Option<RawResponse>,
    },

    /// The proxy answered but the body is not a valid JSON-RPC envelope.
    #[error("{message}")]
    Format { message: String },
}

impl ForwardError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        ForwardError::Transport {
            message: message.into(),
            status: None,
            status_text: None,
            response: None,
        }
    }

    pub(crate) fn format(message: impl Into<String>) -> Self {
        ForwardError::Format {
            message: message.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ForwardError::Transport { .. })
    }

    pub fn is_format(&self) -> bool {
        matches!(self, ForwardError::Format { .. })
    }

    /// HTTP status attached to a transport error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ForwardError::Transport { status, .. } => *status,
            ForwardError::Format { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::EmptyEndpoint.to_string(),
            "endpoint root must not be empty"
        );
        assert_eq!(
            ConfigError::NoTransport("feature disabled".to_string()).to_string(),
            "no HTTP transport available: feature disabled"
        );
    }

    #[test]
    fn test_envelope_error_display() {
        assert_eq!(
            EnvelopeError::NotAnObject("an array").to_string(),
            "expected a JSON object, got an array"
        );
        assert_eq!(
            EnvelopeError::WrongVersion("\"1.0\"".to_string()).to_string(),
            r#""jsonrpc" must be "2.0", got "1.0""#
        );
        assert_eq!(EnvelopeError::MissingId.to_string(), r#"missing "id" field"#);
    }

    #[test]
    fn test_forward_error_kinds() {
        let err = ForwardError::transport("connection refused");
        assert!(err.is_transport());
        assert!(!err.is_format());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "connection refused");

        let err = ForwardError::format("empty response body");
        assert!(err.is_format());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_forward_error_status() {
        let err = ForwardError::Transport {
            message: "unexpected HTTP status 404 Not Found".to_string(),
            status: Some(404),
            status_text: Some("Not Found".to_string()),
            response: None,
        };
        assert_eq!(err.status(), Some(404));
    }
}
