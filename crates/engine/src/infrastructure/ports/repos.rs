//! Repository port traits for database access.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mixit_domain::{
    CanonicalKey, Combination, Discovery, Element, ElementId, ElementName, OwnerId,
};

use super::error::RepoError;

// =============================================================================
// Element Catalog
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ElementRepo: Send + Sync {
    async fn get(&self, id: ElementId) -> Result<Option<Element>, RepoError>;

    /// Case-insensitive lookup on the normalized name.
    async fn find_by_name(&self, name: &ElementName) -> Result<Option<Element>, RepoError>;

    /// All elements, oldest first.
    async fn list_all(&self) -> Result<Vec<Element>, RepoError>;

    /// Insert unless an element with the same normalized name exists.
    /// Returns true when a row was written.
    async fn insert_if_absent(&self, element: &Element) -> Result<bool, RepoError>;
}

// =============================================================================
// Combination Store
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CombinationRepo: Send + Sync {
    async fn get(&self, key: CanonicalKey) -> Result<Option<Combination>, RepoError>;

    /// Atomically store `candidate` (or reuse the element already stored under
    /// its normalized name) together with the combination row for `key`.
    ///
    /// Either both rows are committed or neither is. Returns
    /// `RepoError::Conflict` when a row for `key` already exists.
    async fn create_element_and_combination(
        &self,
        key: CanonicalKey,
        candidate: &Element,
        created_at: DateTime<Utc>,
    ) -> Result<(Element, Combination), RepoError>;

    /// Store a combination row pointing at an element that already exists.
    ///
    /// Returns `RepoError::Conflict` when a row for `key` already exists and
    /// `RepoError::NotFound` when the element does not.
    async fn create_combination(
        &self,
        key: CanonicalKey,
        result_element_id: ElementId,
        created_at: DateTime<Utc>,
    ) -> Result<Combination, RepoError>;

    /// Every combination whose result is `element_id`, oldest first.
    async fn list_producing(&self, element_id: ElementId) -> Result<Vec<Combination>, RepoError>;

    async fn count(&self) -> Result<u64, RepoError>;
}

// =============================================================================
// Inventory
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryRepo: Send + Sync {
    /// Append a discovery. Returns false (and writes nothing) when the owner
    /// already has the element.
    async fn record(&self, discovery: &Discovery) -> Result<bool, RepoError>;

    /// The owner's elements in discovery order.
    async fn list_elements(&self, owner_id: OwnerId) -> Result<Vec<Element>, RepoError>;

    async fn contains(&self, owner_id: OwnerId, element_id: ElementId) -> Result<bool, RepoError>;

    /// Count one more resolved combination for the owner. Returns the new total.
    async fn count_combination(&self, owner_id: OwnerId) -> Result<u64, RepoError>;

    /// Combinations the owner has resolved, cached or not.
    async fn combinations_made(&self, owner_id: OwnerId) -> Result<u64, RepoError>;
}
