//! Inventory use cases.
//!
//! Handles discovery recording, session start and inventory queries.

use std::sync::Arc;

use mixit_domain::{CanonicalKey, Element, ElementId, ElementName, OwnerId};
use serde::Serialize;

use crate::entities::{Catalog, Inventory};
use crate::infrastructure::ports::{ClockPort, RepoError};
use crate::use_cases::combination::ResolutionError;

/// Summary of an owner's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryStats {
    pub discovered: usize,
    /// Longest discovered name; the earliest discovery wins ties.
    pub longest_name: Option<ElementName>,
    /// Successful resolutions by this owner, including cached ones.
    pub combinations_made: u64,
    /// Most stored pairs producing any one element the owner has discovered.
    pub most_recipes_for_one_element: usize,
}

/// Inventory operations.
pub struct InventoryOps {
    catalog: Arc<Catalog>,
    inventory: Arc<Inventory>,
    clock: Arc<dyn ClockPort>,
}

impl InventoryOps {
    pub fn new(
        catalog: Arc<Catalog>,
        inventory: Arc<Inventory>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            catalog,
            inventory,
            clock,
        }
    }

    /// Add an element to the owner's inventory. Returns false if it was already there.
    pub async fn record_discovery(
        &self,
        owner_id: OwnerId,
        element_id: ElementId,
    ) -> Result<bool, ResolutionError> {
        self.require_element(element_id).await?;
        Ok(self
            .inventory
            .record(owner_id, element_id, self.clock.now())
            .await?)
    }

    pub async fn list_inventory(&self, owner_id: OwnerId) -> Result<Vec<Element>, ResolutionError> {
        Ok(self.inventory.list(owner_id).await?)
    }

    /// Make sure the starter elements exist in the catalog.
    pub async fn seed_starter_elements(&self) -> Result<Vec<Element>, RepoError> {
        self.catalog.seed_starters(self.clock.now()).await
    }

    /// Give the owner the starter elements and return the full inventory.
    pub async fn start_session(&self, owner_id: OwnerId) -> Result<Vec<Element>, ResolutionError> {
        let now = self.clock.now();
        for starter in self.catalog.seed_starters(now).await? {
            self.inventory.record(owner_id, starter.id, now).await?;
        }
        tracing::debug!(owner_id = %owner_id, "Session started");
        self.list_inventory(owner_id).await
    }

    pub async fn inventory_stats(
        &self,
        owner_id: OwnerId,
    ) -> Result<InventoryStats, ResolutionError> {
        let elements = self.inventory.list(owner_id).await?;
        let longest_name = elements
            .iter()
            .map(|e| &e.name)
            .fold(None::<&ElementName>, |best, name| match best {
                Some(b) if b.char_len() >= name.char_len() => Some(b),
                _ => Some(name),
            })
            .cloned();

        let mut most_recipes_for_one_element = 0;
        for element in &elements {
            let recipes = self.catalog.recipes_for(element.id).await?.len();
            most_recipes_for_one_element = most_recipes_for_one_element.max(recipes);
        }

        Ok(InventoryStats {
            discovered: elements.len(),
            longest_name,
            combinations_made: self.inventory.combinations_made(owner_id).await?,
            most_recipes_for_one_element,
        })
    }

    /// Canonical keys of every stored pair that produces `element_id`.
    pub async fn recipes_for(
        &self,
        element_id: ElementId,
    ) -> Result<Vec<CanonicalKey>, ResolutionError> {
        self.require_element(element_id).await?;
        Ok(self
            .catalog
            .recipes_for(element_id)
            .await?
            .into_iter()
            .map(|c| c.key)
            .collect())
    }

    pub async fn list_elements(&self) -> Result<Vec<Element>, ResolutionError> {
        Ok(self.catalog.list_elements().await?)
    }

    async fn require_element(&self, element_id: ElementId) -> Result<Element, ResolutionError> {
        self.catalog
            .get_element(element_id)
            .await?
            .ok_or(ResolutionError::ElementNotFound(element_id))
    }
}
