//! Inventory entity operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mixit_domain::{Discovery, Element, ElementId, OwnerId};

use crate::infrastructure::ports::{InventoryRepo, RepoError};

/// Inventory entity operations.
///
/// Per-owner, append-only set of discovered elements.
pub struct Inventory {
    repo: Arc<dyn InventoryRepo>,
}

impl Inventory {
    pub fn new(repo: Arc<dyn InventoryRepo>) -> Self {
        Self { repo }
    }

    /// Returns true when the element was not yet in the owner's inventory.
    pub async fn record(
        &self,
        owner_id: OwnerId,
        element_id: ElementId,
        now: DateTime<Utc>,
    ) -> Result<bool, RepoError> {
        self.repo
            .record(&Discovery::new(owner_id, element_id, now))
            .await
    }

    pub async fn list(&self, owner_id: OwnerId) -> Result<Vec<Element>, RepoError> {
        self.repo.list_elements(owner_id).await
    }

    pub async fn contains(
        &self,
        owner_id: OwnerId,
        element_id: ElementId,
    ) -> Result<bool, RepoError> {
        self.repo.contains(owner_id, element_id).await
    }

    /// Returns the owner's new total.
    pub async fn count_combination(&self, owner_id: OwnerId) -> Result<u64, RepoError> {
        self.repo.count_combination(owner_id).await
    }

    pub async fn combinations_made(&self, owner_id: OwnerId) -> Result<u64, RepoError> {
        self.repo.combinations_made(owner_id).await
    }
}
