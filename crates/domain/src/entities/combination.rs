//! Combination entity - The stored outcome of mixing two elements

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ElementId;
use crate::value_objects::CanonicalKey;

/// The one stored outcome for an unordered pair of elements.
///
/// Exactly one row exists per key. Rows are never mutated or deleted, so a
/// pair resolves to the same element for every player forever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combination {
    pub key: CanonicalKey,
    pub result_element_id: ElementId,
    pub created_at: DateTime<Utc>,
}

impl Combination {
    pub fn new(key: CanonicalKey, result_element_id: ElementId, created_at: DateTime<Utc>) -> Self {
        Self {
            key,
            result_element_id,
            created_at,
        }
    }
}
