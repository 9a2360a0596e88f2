//! External service port traits (generative oracle).

use async_trait::async_trait;
use mixit_domain::Element;
use serde::{Deserialize, Serialize};

use super::error::OracleError;

// =============================================================================
// Oracle Types
// =============================================================================

/// Structured but unvalidated answer from the oracle.
///
/// Fields are optional because the remote model is untrusted: a missing field
/// is a validation failure, decided by the caller, not a transport failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOracleResponse {
    pub name: Option<String>,
    pub icon: Option<String>,
}

impl RawOracleResponse {
    pub fn new(name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            icon: Some(icon.into()),
        }
    }
}

/// Boundary to the external generative service that invents the result of an
/// unseen pair. Implementations perform no caching.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OracleClient: Send + Sync {
    async fn synthesize(
        &self,
        element_a: &Element,
        element_b: &Element,
    ) -> Result<RawOracleResponse, OracleError>;

    /// Propose an arcade goal as a comma-separated list: the goal word
    /// first, then other names for the same thing. None of `excluded` may
    /// be the goal word. The text is unvalidated.
    async fn propose_goal(&self, excluded: &[String]) -> Result<String, OracleError>;
}
