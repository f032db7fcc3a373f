//! Error types for the client layer.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Remote error codes that will fail the same way on every attempt.
pub const PERMANENT_REMOTE_CODES: &[&str] = &[
    "validation_error",
    "invalid_json",
    "invalid_request",
    "invalid_request_url",
    "unauthorized",
    "restricted_resource",
    "object_not_found",
    "missing_version",
];

/// Why a transport attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The attempt exceeded its connect or total deadline.
    Timeout,
    /// The peer could not be resolved or reached.
    Connect,
    /// The connection broke mid-exchange.
    Io,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Io => "io",
        })
    }
}

/// Errors that can occur talking to a remote API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("transport error ({kind}): {message}")]
    Transport {
        /// Failure reason.
        kind: TransportErrorKind,
        /// Error message.
        message: String,
    },

    /// The response was not a success or could not be parsed.
    #[error("protocol error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Protocol {
        /// HTTP status, if a response was received.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// The remote API answered with a well-formed error payload.
    #[error("remote error {status} {}: {message}", code.as_deref().unwrap_or("unknown"))]
    Remote {
        /// HTTP status.
        status: u16,
        /// API error category.
        code: Option<String>,
        /// API error message.
        message: String,
        /// Server-requested wait before the next attempt.
        retry_after: Option<Duration>,
    },

    /// Every attempt failed.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The error of the final attempt.
        #[source]
        last: Box<ClientError>,
    },

    /// A request body could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),

    /// A property schema could not be loaded or does not match.
    #[error("schema error: {0}")]
    Schema(String),
}

impl ClientError {
    /// Creates a timeout transport error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Transport {
            kind: TransportErrorKind::Timeout,
            message: message.into(),
        }
    }

    /// Creates a connection transport error.
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Transport {
            kind: TransportErrorKind::Connect,
            message: message.into(),
        }
    }

    /// Creates an I/O transport error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Transport {
            kind: TransportErrorKind::Io,
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Protocol {
            status,
            message: message.into(),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport { .. } => true,
            ClientError::Protocol { .. } => true,
            ClientError::Remote { code, .. } => !code
                .as_deref()
                .is_some_and(|code| PERMANENT_REMOTE_CODES.contains(&code)),
            ClientError::Exhausted { .. } => false,
            ClientError::Encode(_) => false,
            ClientError::Schema(_) => false,
        }
    }

    /// Returns true if the error, or the last cause of an exhausted retry,
    /// is a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            ClientError::Transport { kind, .. } => *kind == TransportErrorKind::Timeout,
            ClientError::Exhausted { last, .. } => last.is_timeout(),
            _ => false,
        }
    }

    /// Returns the server-requested wait, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ClientError::Remote { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Returns the remote error code, looking through exhaustion.
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            ClientError::Remote { code, .. } => code.as_deref(),
            ClientError::Exhausted { last, .. } => last.remote_code(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Encode(err.to_string())
    }
}
