//! Discovery entity - An owner's record of having obtained an element

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ElementId, OwnerId};

/// Inventory entry. Append-only: at most one per (owner, element).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
    pub owner_id: OwnerId,
    pub element_id: ElementId,
    pub discovered_at: DateTime<Utc>,
}

impl Discovery {
    pub fn new(owner_id: OwnerId, element_id: ElementId, discovered_at: DateTime<Utc>) -> Self {
        Self {
            owner_id,
            element_id,
            discovered_at,
        }
    }
}
