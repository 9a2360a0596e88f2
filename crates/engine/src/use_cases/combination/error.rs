//! Combination resolution errors and outcomes.

use mixit_domain::{Element, ElementId};
use serde::Serialize;

use crate::infrastructure::ports::{OracleError, RepoError};

/// Errors returned by `resolve_combination`, the inventory queries and arcade goals.
///
/// `Clone` because one failed resolution is delivered to every caller that
/// was attached to it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),
    #[error("Oracle unreachable after {attempts} attempt(s): {message}")]
    OracleTransport { attempts: u32, message: String },
    #[error("Oracle answer rejected after {attempts} attempt(s): {message}")]
    OracleValidation { attempts: u32, message: String },
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResolutionError {
    /// Final oracle failure after `attempts` calls.
    pub fn from_oracle(error: OracleError, attempts: u32) -> Self {
        match error {
            OracleError::Transport { kind, message } => Self::OracleTransport {
                attempts,
                message: format!("{kind}: {message}"),
            },
            OracleError::Validation(message) => Self::OracleValidation { attempts, message },
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether asking again later could give a different answer.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::OracleTransport { .. } | Self::OracleValidation { .. } | Self::StoreUnavailable(_)
        )
    }
}

impl From<RepoError> for ResolutionError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Database { .. } => Self::StoreUnavailable(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// How a resolved element was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// The pair was already in the combination store.
    Cached,
    /// This call elected itself and asked the oracle.
    Synthesized,
    /// Another caller was already resolving the pair; this call waited for it.
    Joined,
}

/// Successful result of combining two elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedElement {
    pub element: Element,
    pub source: ResolutionSource,
    /// True when the element was new to the requesting owner's inventory.
    pub newly_discovered: bool,
}
