//! Error types for port operations.

use std::fmt;

/// Repository operation errors with context for debugging.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Entity not found - includes entity type and ID for actionable error messages.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Database operation failed - includes operation name for tracing.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// A row with the same unique key already exists.
    #[error("{entity_type} already exists: {key}")]
    Conflict {
        entity_type: &'static str,
        key: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Business constraint violated.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl RepoError {
    /// Create a NotFound error with entity type and ID context.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Create a Database error with operation context.
    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    /// Create a Conflict error for a duplicate unique key.
    pub fn conflict(entity_type: &'static str, key: impl ToString) -> Self {
        Self::Conflict {
            entity_type,
            key: key.to_string(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }

    /// Create a ConstraintViolation error.
    pub fn constraint(message: impl ToString) -> Self {
        Self::ConstraintViolation(message.to_string())
    }

    /// Check if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a Conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// What went wrong on the wire when calling the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The call exceeded its time budget.
    Timeout,
    /// Connection could not be established or was dropped.
    Connection,
    /// The service answered with a non-success HTTP status.
    Status(u16),
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Connection => write!(f, "connection"),
            Self::Status(code) => write!(f, "status {code}"),
        }
    }
}

/// Oracle failures. Transport and validation are distinct so callers can
/// tell "network issue" apart from "the mix didn't work".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("Oracle transport failure ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },
    #[error("Oracle response rejected: {0}")]
    Validation(String),
}

impl OracleError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Transport {
            kind: TransportErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Transport {
            kind: TransportErrorKind::Connection,
            message: message.into(),
        }
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            kind: TransportErrorKind::Status(code),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Malformed responses are retried like transient transport failures.
    /// Bad requests and auth failures are not: repeating them cannot help.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport {
                kind: TransportErrorKind::Status(code),
                ..
            } => !matches!(code, 400 | 401 | 403 | 404),
            Self::Transport { .. } => true,
            Self::Validation(_) => true,
        }
    }
}
